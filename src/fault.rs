//! The two failure tiers of guest memory access.
//!
//! A [`TranslationFault`] is an ordinary outcome: the guest simply has no
//! usable mapping at that address right now. A [`FatalCondition`] is not
//! recoverable and only ever reaches [`fatal`], which does not return.

use core::fmt;

use axerrno::AxError;

use crate::GuestVirtAddr;

numeric_enum_macro::numeric_enum! {
    #[repr(u8)]
    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    /// Fault class, bits `[5:2]` of the PAR_EL1.FST field.
    pub enum FaultClass {
        /// Output address wider than the configured physical address size.
        AddressSize = 0b0000,
        /// No valid descriptor at the reported level.
        Translation = 0b0001,
        /// Access flag clear in the final descriptor.
        AccessFlag = 0b0010,
        /// The descriptor does not grant read permission.
        Permission = 0b0011,
        /// Synchronous external abort, not on a table walk.
        SyncExternal = 0b0100,
        /// Synchronous external abort on a table walk.
        SyncExternalOnWalk = 0b0101,
        /// Parity or ECC error, not on a table walk.
        SyncParity = 0b0110,
        /// Parity or ECC error on a table walk.
        SyncParityOnWalk = 0b0111,
        /// TLB conflict abort.
        TlbConflict = 0b1100,
    }
}

/// Fault information reported in PAR_EL1 when `PAR_EL1.F` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultStatus {
    /// Raw 6-bit fault status code (`PAR_EL1.FST`).
    pub fst: u8,
    /// The fault was taken on stage 2 (`PAR_EL1.S`).
    pub stage2: bool,
    /// The stage 2 fault happened while walking the stage 1 tables
    /// (`PAR_EL1.PTW`).
    pub ptw: bool,
}

impl FaultStatus {
    /// Decoded fault class, or the raw class bits if the encoding is not one
    /// this crate knows.
    pub fn class(&self) -> Result<FaultClass, u8> {
        FaultClass::try_from(self.fst >> 2)
    }

    /// Lookup level of the fault, meaningful for address size, translation,
    /// access flag and permission faults.
    pub fn level(&self) -> u8 {
        self.fst & 0b11
    }

    /// Whether the hardware reported a condition the supervisor cannot
    /// continue from.
    pub fn is_fatal(&self) -> bool {
        matches!(self.class(), Ok(FaultClass::TlbConflict))
    }
}

/// A guest virtual address had no usable mapping when it was translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationFault {
    /// The address that was translated.
    pub gva: GuestVirtAddr,
    /// What the hardware reported.
    pub status: FaultStatus,
}

impl fmt::Display for TranslationFault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.status.class() {
            Ok(class) => write!(
                f,
                "{:?} fault at level {} for {:?}",
                class,
                self.status.level(),
                self.gva
            )?,
            Err(raw) => write!(f, "fault class {raw:#06b} for {:?}", self.gva)?,
        }
        if self.status.stage2 {
            f.write_str(" (stage 2")?;
            if self.status.ptw {
                f.write_str(", stage 1 walk")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Why a guest memory access did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// The access stopped on a translation fault.
    ///
    /// Bytes belonging to the pages before the faulting one have already
    /// been transferred and stay transferred.
    Translation {
        /// The fault that stopped the access.
        fault: TranslationFault,
        /// Number of bytes transferred before the fault.
        transferred: usize,
    },
    /// The range runs past the top of the guest address space. Nothing was
    /// translated or transferred.
    AddressOverflow {
        /// Start of the requested range.
        gva: GuestVirtAddr,
        /// Requested length.
        len: usize,
    },
}

impl AccessError {
    /// Number of bytes transferred before the access stopped.
    pub fn transferred(&self) -> usize {
        match self {
            Self::Translation { transferred, .. } => *transferred,
            Self::AddressOverflow { .. } => 0,
        }
    }

    /// The translation fault that stopped the access, if any.
    pub fn fault(&self) -> Option<&TranslationFault> {
        match self {
            Self::Translation { fault, .. } => Some(fault),
            Self::AddressOverflow { .. } => None,
        }
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Translation { fault, transferred } => {
                write!(f, "{fault} after {transferred:#x} bytes")
            }
            Self::AddressOverflow { gva, len } => {
                write!(f, "{len:#x} bytes at {gva:?} wrap past the top of the address space")
            }
        }
    }
}

impl From<TranslationFault> for AxError {
    fn from(_: TranslationFault) -> Self {
        AxError::BadAddress
    }
}

impl From<AccessError> for AxError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Translation { fault, .. } => fault.into(),
            AccessError::AddressOverflow { .. } => AxError::InvalidInput,
        }
    }
}

/// Conditions after which the supervisor cannot safely continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalCondition {
    /// A translation was requested while IRQs were unmasked.
    InterruptsEnabled {
        /// The address that was about to be translated.
        gva: GuestVirtAddr,
    },
    /// The translation hardware reported a TLB conflict.
    TlbConflict {
        /// The address whose translation reported it.
        gva: GuestVirtAddr,
    },
}

impl fmt::Display for FatalCondition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InterruptsEnabled { gva } => {
                write!(f, "translation of {gva:?} requested with IRQs enabled")
            }
            Self::TlbConflict { gva } => write!(f, "TLB conflict abort translating {gva:?}"),
        }
    }
}

/// Halts the current core. Never returns.
pub fn fatal(cond: FatalCondition) -> ! {
    error!("guest memory access: {cond}");
    halt(cond)
}

cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "aarch64", target_os = "none", feature = "arm-el2"))] {
        fn halt(_cond: FatalCondition) -> ! {
            crate::arch::trap_and_hang()
        }
    } else {
        fn halt(cond: FatalCondition) -> ! {
            panic!("unrecoverable condition: {cond}")
        }
    }
}
