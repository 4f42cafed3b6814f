//! Guest virtual to host physical address translation.
//!
//! On AArch64 the stage 1 and stage 2 walks are performed in one go by the
//! `AT S12E1R` instruction, which leaves its result in `PAR_EL1`. The
//! translation is valid only at the moment it is taken: guest page tables may
//! change at any time, so results are never cached.

use bit_field::BitField;
use bitflags::bitflags;

use crate::addr::{PAGE_OFFSET_MASK, PAGE_SHIFT, mask2};
use crate::fault::{FatalCondition, FaultStatus, TranslationFault, fatal};
use crate::hal::GuestAccessHal;
use crate::{GuestVirtAddr, HostPhysAddr};

/// Result of translating one guest virtual address.
///
/// The host physical address already includes the page offset of the input.
pub type TranslationResult = Result<HostPhysAddr, TranslationFault>;

cfg_if::cfg_if! {
    if #[cfg(feature = "pa-48bit")] {
        /// Width of the output address reported in PAR_EL1.
        pub const PA_BITS: usize = 48;
    } else {
        /// Width of the output address reported in PAR_EL1.
        pub const PA_BITS: usize = 40;
    }
}

/// Bits of PAR_EL1 holding the physical frame address on success.
pub const FRAME_ADDR_MASK: u64 = mask2(PA_BITS, PAGE_SHIFT);

bitflags! {
    /// Single-bit fields of PAR_EL1.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ParFlags: u64 {
        /// The translation aborted.
        const F =   1 << 0;
        /// Stage 2 fault during a stage 1 table walk. Only when `F` is set.
        const PTW = 1 << 8;
        /// The fault was a stage 2 fault. Only when `F` is set.
        const S =   1 << 9;
    }
}

/// Translates guest virtual addresses to host physical addresses.
pub trait AddressTranslator {
    /// Translates `gva` with a read permission check.
    ///
    /// Must be called with IRQs masked on the current core. Pages the guest
    /// mapped read-only translate successfully; this does not validate write
    /// access.
    fn translate(&self, gva: GuestVirtAddr) -> TranslationResult;
}

impl<T: AddressTranslator + ?Sized> AddressTranslator for &T {
    fn translate(&self, gva: GuestVirtAddr) -> TranslationResult {
        (**self).translate(gva)
    }
}

/// Decodes the PAR_EL1 value produced by translating `gva`.
pub fn decode_par(par: u64, gva: GuestVirtAddr) -> TranslationResult {
    let flags = ParFlags::from_bits_truncate(par);
    if flags.contains(ParFlags::F) {
        return Err(TranslationFault {
            gva,
            status: FaultStatus {
                fst: par.get_bits(1..7) as u8,
                stage2: flags.contains(ParFlags::S),
                ptw: flags.contains(ParFlags::PTW),
            },
        });
    }
    let frame = par & FRAME_ADDR_MASK;
    let offset = (gva.as_usize() & PAGE_OFFSET_MASK) as u64;
    Ok(HostPhysAddr::from_usize((frame | offset) as usize))
}

/// Decodes `par` like [`decode_par`], halting on faults the supervisor cannot
/// recover from.
pub fn finish_translation(par: u64, gva: GuestVirtAddr) -> TranslationResult {
    let result = decode_par(par, gva);
    if let Err(fault) = &result {
        if fault.status.is_fatal() {
            fatal(FatalCondition::TlbConflict { gva });
        }
    }
    result
}

/// Halts unless IRQs are masked on the current core.
///
/// A hardware walk and the following `PAR_EL1` read must not be split by an
/// exception handler that may issue its own walk.
#[cfg_attr(
    not(all(target_arch = "aarch64", feature = "arm-el2")),
    allow(dead_code)
)]
pub(crate) fn ensure_irqs_masked<H: GuestAccessHal>(gva: GuestVirtAddr) {
    if H::irqs_enabled() {
        warn!("translating {gva:?} with IRQs enabled");
        fatal(FatalCondition::InterruptsEnabled { gva });
    }
}

#[cfg(all(target_arch = "aarch64", feature = "arm-el2"))]
pub use self::stage12::Stage12Translator;

#[cfg(all(target_arch = "aarch64", feature = "arm-el2"))]
mod stage12 {
    use core::marker::PhantomData;

    use super::{AddressTranslator, TranslationResult, ensure_irqs_masked, finish_translation};
    use crate::GuestVirtAddr;
    use crate::arch;
    use crate::hal::GuestAccessHal;

    /// Hardware translator for the EL1&0 regime of the guest currently
    /// loaded on this core.
    pub struct Stage12Translator<H: GuestAccessHal> {
        _marker: PhantomData<H>,
    }

    impl<H: GuestAccessHal> Stage12Translator<H> {
        /// Creates a translator. It holds no state.
        pub const fn new() -> Self {
            Self {
                _marker: PhantomData,
            }
        }

        /// Translates `gva` with a write permission check (`AT S12E1W`).
        ///
        /// Same precondition as [`AddressTranslator::translate`].
        pub fn translate_for_write(&self, gva: GuestVirtAddr) -> TranslationResult {
            ensure_irqs_masked::<H>(gva);
            // SAFETY: IRQs are masked, so nothing else on this core can
            // clobber PAR_EL1 between the walk and the read.
            let par = unsafe { arch::at_s12e1w(gva.as_usize() as u64) };
            finish_translation(par, gva)
        }
    }

    impl<H: GuestAccessHal> Default for Stage12Translator<H> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<H: GuestAccessHal> AddressTranslator for Stage12Translator<H> {
        fn translate(&self, gva: GuestVirtAddr) -> TranslationResult {
            ensure_irqs_masked::<H>(gva);
            // SAFETY: see `translate_for_write`.
            let par = unsafe { arch::at_s12e1r(gva.as_usize() as u64) };
            finish_translation(par, gva)
        }
    }
}
