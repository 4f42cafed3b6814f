//! [ArceOS-Hypervisor](https://github.com/arceos-hypervisor/) guest memory access module.
//!
//! Lets code running at EL2 read and write the memory of the guest running at
//! EL1 through guest virtual addresses, translating every page with the
//! hardware two-stage walker before touching it.

#![no_std]

#[macro_use]
extern crate log;
#[cfg(test)]
extern crate alloc;

mod accessor;
mod addr;
mod fault;
mod hal;
mod region;
mod translator;

pub mod arch;
pub mod endian;

#[cfg(test)]
pub(crate) mod test_utils;

pub use accessor::GuestMemoryAccessor;
pub use addr::*;
pub use fault::{
    AccessError, FatalCondition, FaultClass, FaultStatus, TranslationFault, fatal,
};
pub use hal::{GuestAccessHal, IrqGuard};
pub use region::{MemoryRegion, overlaps};
pub use translator::*;
