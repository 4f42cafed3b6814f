use memory_addr::{PAGE_SIZE_4K, PhysAddr, VirtAddr, def_usize_addr, def_usize_addr_formatter};

/// Host virtual address.
pub type HostVirtAddr = VirtAddr;
/// Host physical address.
pub type HostPhysAddr = PhysAddr;

def_usize_addr! {
    /// Guest virtual address, as seen by the EL1&0 translation regime.
    pub type GuestVirtAddr;
}

def_usize_addr_formatter! {
    GuestVirtAddr = "GVA:{}";
}

/// Number of bits in the offset part of an address, fixed by the 4 KiB
/// translation granule.
pub const PAGE_SHIFT: usize = 12;

/// Size of a translation granule in bytes.
pub const PAGE_SIZE: usize = PAGE_SIZE_4K;

/// Mask selecting the offset of an address inside its page.
pub const PAGE_OFFSET_MASK: usize = mask(PAGE_SHIFT);

const _: () = assert!(PAGE_SIZE == 1 << PAGE_SHIFT);

/// Returns a `u64` with only bit `n` set.
#[inline]
pub const fn bit(n: usize) -> u64 {
    1 << n
}

/// Returns a `usize` with the lowest `n` bits set.
#[inline]
pub const fn mask(n: usize) -> usize {
    (1 << n) - 1
}

/// Returns a `u64` with bits `[lo, hi)` set.
#[inline]
pub const fn mask2(hi: usize, lo: usize) -> u64 {
    (bit(hi) - 1) & !(bit(lo) - 1)
}

/// Returns the page offset of `gva`.
#[inline]
pub const fn page_offset(gva: GuestVirtAddr) -> usize {
    gva.as_usize() & PAGE_OFFSET_MASK
}

/// Returns how many bytes remain between `gva` and the end of its page.
#[inline]
pub const fn bytes_left_in_page(gva: GuestVirtAddr) -> usize {
    PAGE_SIZE - page_offset(gva)
}

/// Checks whether accessing `size` bytes starting at `gva` touches more than
/// one page.
pub fn crosses_page_boundary(gva: GuestVirtAddr, size: usize) -> bool {
    size > bytes_left_in_page(gva)
}

/// Checks whether `a + b` overflows a 32-bit register.
///
/// For bounds checks on 32-bit guest values, e.g. a base plus a length
/// taken from an AArch32 guest.
pub const fn add_overflows_u32(a: u32, b: u32) -> bool {
    a.checked_add(b).is_none()
}
