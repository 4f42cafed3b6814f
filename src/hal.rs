use core::marker::PhantomData;

use crate::{HostPhysAddr, HostVirtAddr};

/// Platform services the guest memory accessor relies on.
///
/// Implemented once by the embedding hypervisor. On AArch64 the IRQ methods
/// can forward to [`crate::arch`].
pub trait GuestAccessHal {
    /// Converts a host physical address to a host virtual address the
    /// supervisor can dereference.
    fn phys_to_virt(paddr: HostPhysAddr) -> HostVirtAddr;

    /// Returns `true` if IRQs are unmasked on the current core.
    fn irqs_enabled() -> bool;

    /// Masks IRQs on the current core.
    fn disable_irqs();

    /// Unmasks IRQs on the current core.
    fn enable_irqs();
}

/// Masks IRQs on the current core until dropped, then restores the state
/// that was in effect when it was created.
///
/// Guards may nest; only the outermost one re-enables IRQs.
pub struct IrqGuard<H: GuestAccessHal> {
    irqs_were_enabled: bool,
    // The saved state belongs to this core.
    _marker: PhantomData<(H, *mut ())>,
}

// No `Default`: creating a guard masks IRQs, which must stay explicit.
#[allow(clippy::new_without_default)]
impl<H: GuestAccessHal> IrqGuard<H> {
    /// Saves the current IRQ state and masks IRQs.
    pub fn new() -> Self {
        let irqs_were_enabled = H::irqs_enabled();
        H::disable_irqs();
        Self {
            irqs_were_enabled,
            _marker: PhantomData,
        }
    }

    /// Whether IRQs were unmasked when this guard was taken.
    pub fn irqs_were_enabled(&self) -> bool {
        self.irqs_were_enabled
    }
}

impl<H: GuestAccessHal> Drop for IrqGuard<H> {
    fn drop(&mut self) {
        if self.irqs_were_enabled {
            H::enable_irqs();
        }
    }
}
