//! Guest memory access through guest virtual addresses.
//!
//! Every access is split at 4 KiB page boundaries and each page is translated
//! on its own, right before it is touched, since neighbouring guest pages are
//! usually backed by unrelated host frames.
//!
//! IRQs are masked for each single-page translate-and-copy step and restored
//! to their previous state between pages, so a large transfer never keeps
//! IRQs masked for longer than one page copy.
use core::marker::PhantomData;
use core::mem::{MaybeUninit, size_of};

use crate::addr::bytes_left_in_page;
use crate::fault::AccessError;
use crate::hal::{GuestAccessHal, IrqGuard};
use crate::translator::AddressTranslator;
use crate::{GuestVirtAddr, HostVirtAddr};

/// Guest memory access with injected translator
pub struct GuestMemoryAccessor<T, H> {
    translator: T,
    _hal: PhantomData<H>,
}

impl<T: Clone, H> Clone for GuestMemoryAccessor<T, H> {
    fn clone(&self) -> Self {
        Self::new(self.translator.clone())
    }
}

impl<T, H> GuestMemoryAccessor<T, H> {
    /// Create a new guest memory accessor
    pub const fn new(translator: T) -> Self {
        Self {
            translator,
            _hal: PhantomData,
        }
    }

    /// Returns the underlying translator.
    pub fn translator(&self) -> &T {
        &self.translator
    }
}

impl<T: AddressTranslator, H: GuestAccessHal> GuestMemoryAccessor<T, H> {
    /// Walks `[guest_addr, guest_addr + len)` page by page.
    ///
    /// For each page, translates its first byte and calls `f` with the host
    /// address, the offset into the caller's buffer and the chunk length,
    /// all with IRQs masked. Stops at the first translation fault. A range
    /// that runs past the top of the address space is rejected before any
    /// translation.
    fn for_each_page<F>(&self, guest_addr: GuestVirtAddr, len: usize, mut f: F) -> Result<(), AccessError>
    where
        F: FnMut(HostVirtAddr, usize, usize),
    {
        if len > 0 && guest_addr.as_usize().checked_add(len - 1).is_none() {
            debug!(
                "guest access [{:?}, +{:#x}) wraps the address space",
                guest_addr, len
            );
            return Err(AccessError::AddressOverflow {
                gva: guest_addr,
                len,
            });
        }

        let mut cursor = guest_addr;
        let mut done = 0;

        while done < len {
            let chunk = bytes_left_in_page(cursor).min(len - done);
            {
                let _irq = IrqGuard::<H>::new();
                let host_paddr = self.translator.translate(cursor).map_err(|fault| {
                    debug!(
                        "guest access [{:?}, +{:#x}) stopped: {}",
                        guest_addr, len, fault
                    );
                    AccessError::Translation {
                        fault,
                        transferred: done,
                    }
                })?;
                trace!("{:?} -> {:#x}, {:#x} bytes", cursor, host_paddr, chunk);
                f(H::phys_to_virt(host_paddr), done, chunk);
            }
            cursor = GuestVirtAddr::from_usize(cursor.as_usize().wrapping_add(chunk));
            done += chunk;
        }

        Ok(())
    }

    /// Read a buffer from guest memory
    ///
    /// On error, the bytes of the pages before the faulting one have already
    /// been copied into `buffer`; the rest of `buffer` is untouched.
    pub fn read_buffer(&self, guest_addr: GuestVirtAddr, buffer: &mut [u8]) -> Result<(), AccessError> {
        let dst = buffer.as_mut_ptr();
        self.for_each_page(guest_addr, buffer.len(), |host_addr, offset, chunk| unsafe {
            core::ptr::copy_nonoverlapping(host_addr.as_ptr(), dst.add(offset), chunk);
        })
    }

    /// Write a buffer to guest memory
    ///
    /// Not rolled back on error: guest pages before the faulting one keep the
    /// new bytes.
    pub fn write_buffer(&self, guest_addr: GuestVirtAddr, buffer: &[u8]) -> Result<(), AccessError> {
        let src = buffer.as_ptr();
        self.for_each_page(guest_addr, buffer.len(), |host_addr, offset, chunk| unsafe {
            core::ptr::copy_nonoverlapping(src.add(offset), host_addr.as_mut_ptr(), chunk);
        })
    }

    /// Reads `buffer.len()` bytes at `guest_addr`.
    ///
    /// Returns `true` iff every byte was translated and copied.
    pub fn read_guest_memory(&self, buffer: &mut [u8], guest_addr: GuestVirtAddr) -> bool {
        self.read_buffer(guest_addr, buffer).is_ok()
    }

    /// Writes `buffer` at `guest_addr`.
    ///
    /// Returns `true` iff every byte was translated and copied.
    pub fn write_guest_memory(&self, guest_addr: GuestVirtAddr, buffer: &[u8]) -> bool {
        self.write_buffer(guest_addr, buffer).is_ok()
    }

    /// Read a value of type V from guest memory
    ///
    /// The value may straddle a page boundary.
    ///
    /// # Safety
    ///
    /// Every bit pattern of `size_of::<V>()` bytes must be a valid `V`. Plain
    /// integers and arrays of them qualify; `bool`, `char`, enums and
    /// references do not.
    pub unsafe fn read_obj<V: Copy>(&self, guest_addr: GuestVirtAddr) -> Result<V, AccessError> {
        let mut val = MaybeUninit::<V>::zeroed();
        // SAFETY: the zeroed storage is `size_of::<V>()` initialized bytes.
        let bytes =
            unsafe { core::slice::from_raw_parts_mut(val.as_mut_ptr().cast::<u8>(), size_of::<V>()) };
        self.read_buffer(guest_addr, bytes)?;
        // SAFETY: every byte has been overwritten with guest memory, and the
        // caller guarantees any bit pattern is a valid `V`.
        Ok(unsafe { val.assume_init() })
    }

    /// Write a value of type V to guest memory
    pub fn write_obj<V: Copy>(&self, guest_addr: GuestVirtAddr, val: V) -> Result<(), AccessError> {
        // SAFETY: `val` lives on the stack for the whole call.
        let bytes =
            unsafe { core::slice::from_raw_parts((&val as *const V).cast::<u8>(), size_of::<V>()) };
        self.write_buffer(guest_addr, bytes)
    }
}
