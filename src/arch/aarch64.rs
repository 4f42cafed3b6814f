//! AArch64 EL2 primitives.
//!
//! Everything here must run at EL2.

use core::arch::asm;

use bit_field::BitField;
use bitflags::bitflags;

bitflags! {
    /// Exception mask bits in `DAIF`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Daif: u64 {
        /// Debug exceptions masked.
        const D = 1 << 9;
        /// SError masked.
        const A = 1 << 8;
        /// IRQ masked.
        const I = 1 << 7;
        /// FIQ masked.
        const F = 1 << 6;
    }
}

/// Translates `vaddr` through stage 1 and stage 2 of the EL1&0 regime with a
/// read permission check and returns the resulting `PAR_EL1`.
///
/// # Safety
///
/// IRQs must be masked, otherwise another translation on this core may
/// overwrite `PAR_EL1` before it is read.
#[inline]
pub unsafe fn at_s12e1r(vaddr: u64) -> u64 {
    let par: u64;
    unsafe {
        asm!(
            "at s12e1r, {va}",
            "isb",
            "mrs {par}, par_el1",
            va = in(reg) vaddr,
            par = out(reg) par,
            options(nostack, preserves_flags),
        );
    }
    par
}

/// Like [`at_s12e1r`], with a write permission check.
///
/// # Safety
///
/// Same as [`at_s12e1r`].
#[inline]
pub unsafe fn at_s12e1w(vaddr: u64) -> u64 {
    let par: u64;
    unsafe {
        asm!(
            "at s12e1w, {va}",
            "isb",
            "mrs {par}, par_el1",
            va = in(reg) vaddr,
            par = out(reg) par,
            options(nostack, preserves_flags),
        );
    }
    par
}

/// Reads the current `DAIF` mask.
#[inline]
pub fn daif() -> Daif {
    let bits: u64;
    unsafe { asm!("mrs {}, daif", out(reg) bits, options(nomem, nostack, preserves_flags)) };
    Daif::from_bits_truncate(bits)
}

/// Returns `true` if IRQs are not masked on this core.
#[inline]
pub fn irqs_enabled() -> bool {
    !daif().contains(Daif::I)
}

/// Masks IRQs on this core.
#[inline]
pub fn disable_irqs() {
    unsafe { asm!("msr daifset, #2", options(nostack, preserves_flags)) };
}

/// Unmasks IRQs on this core.
#[inline]
pub fn enable_irqs() {
    unsafe { asm!("msr daifclr, #2", options(nostack, preserves_flags)) };
}

/// Full system data synchronization barrier.
#[inline]
pub fn dsb_sy() {
    unsafe { asm!("dsb sy", options(nostack, preserves_flags)) };
}

/// Instruction synchronization barrier.
#[inline]
pub fn isb() {
    unsafe { asm!("isb", options(nostack, preserves_flags)) };
}

/// Invalidates all stage 1 and stage 2 EL1&0 TLB entries for the current VMID
/// on this core.
#[inline]
pub fn tlb_invalidate_el1_stage12() {
    unsafe { asm!("tlbi alle1", options(nostack, preserves_flags)) };
}

/// Affinity level 0 of this core (`MPIDR_EL1.Aff0`).
#[inline]
pub fn core_id() -> u32 {
    let mpidr: u64;
    unsafe { asm!("mrs {}, mpidr_el1", out(reg) mpidr, options(nomem, nostack, preserves_flags)) };
    mpidr.get_bits(0..8) as u32
}

/// Reads `DBGAUTHSTATUS_EL1`.
#[inline]
pub fn debug_authentication_status() -> u64 {
    let status: u64;
    unsafe {
        asm!("mrs {}, dbgauthstatus_el1", out(reg) status, options(nomem, nostack, preserves_flags))
    };
    status
}

/// Reads the saved program status of the exception taken to EL2.
#[inline]
pub fn spsr_el2() -> u32 {
    let spsr: u64;
    unsafe { asm!("mrs {}, spsr_el2", out(reg) spsr, options(nomem, nostack, preserves_flags)) };
    spsr as u32
}

/// Raises a breakpoint exception and, should it return, parks the core with
/// IRQs masked.
pub fn trap_and_hang() -> ! {
    unsafe { asm!("brk #0x3e8", options(nomem, nostack)) };
    disable_irqs();
    loop {
        unsafe { asm!("wfi", options(nomem, nostack, preserves_flags)) };
    }
}
