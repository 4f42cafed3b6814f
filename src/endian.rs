//! Endian-aware scalar access to memory the supervisor has already mapped.
//!
//! These operate on host addresses, never on guest virtual ones. Use the
//! guest memory accessor to move guest bytes first.
//!
//! # Safety
//!
//! For every function here, `base + offset` must be valid for a volatile
//! access of the scalar's size and aligned to it.

/// Reads a little-endian `u32` at `base + offset`.
#[inline]
pub unsafe fn read32le(base: *const u8, offset: usize) -> u32 {
    u32::from_le(unsafe { base.add(offset).cast::<u32>().read_volatile() })
}

/// Reads a big-endian `u32` at `base + offset`.
#[inline]
pub unsafe fn read32be(base: *const u8, offset: usize) -> u32 {
    let value = unsafe { read32le(base, offset) };
    value.swap_bytes()
}

/// Reads a little-endian `u64` at `base + offset`.
#[inline]
pub unsafe fn read64le(base: *const u8, offset: usize) -> u64 {
    u64::from_le(unsafe { base.add(offset).cast::<u64>().read_volatile() })
}

/// Reads a big-endian `u64` at `base + offset`.
#[inline]
pub unsafe fn read64be(base: *const u8, offset: usize) -> u64 {
    let value = unsafe { read64le(base, offset) };
    value.swap_bytes()
}

/// Writes `value` as a little-endian `u32` at `base + offset`.
#[inline]
pub unsafe fn write32le(base: *mut u8, offset: usize, value: u32) {
    unsafe { base.add(offset).cast::<u32>().write_volatile(value.to_le()) }
}

/// Writes `value` as a big-endian `u32` at `base + offset`.
#[inline]
pub unsafe fn write32be(base: *mut u8, offset: usize, value: u32) {
    unsafe { write32le(base, offset, value.swap_bytes()) }
}

/// Writes `value` as a little-endian `u64` at `base + offset`.
#[inline]
pub unsafe fn write64le(base: *mut u8, offset: usize, value: u64) {
    unsafe { base.add(offset).cast::<u64>().write_volatile(value.to_le()) }
}

/// Writes `value` as a big-endian `u64` at `base + offset`.
#[inline]
pub unsafe fn write64be(base: *mut u8, offset: usize, value: u64) {
    unsafe { write64le(base, offset, value.swap_bytes()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(align(8))]
    struct Words([u8; 32]);

    #[test]
    fn test_le_reads_follow_byte_order() {
        let mut mem = Words([0; 32]);
        mem.0[8..16].copy_from_slice(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
        let base = mem.0.as_ptr();
        unsafe {
            assert_eq!(read32le(base, 8), 0x0403_0201);
            assert_eq!(read32be(base, 8), 0x0102_0304);
            assert_eq!(read64le(base, 8), 0x0807_0605_0403_0201);
            assert_eq!(read64be(base, 8), 0x0102_0304_0506_0708);
        }
    }

    #[test]
    fn test_be_is_byte_reversal_of_le() {
        let patterns: [u64; 6] = [
            0,
            u64::MAX,
            0x0123_4567_89ab_cdef,
            0x8000_0000_0000_0001,
            0xdead_beef_cafe_babe,
            0x00ff_00ff_00ff_00ff,
        ];
        let mut mem = Words([0; 32]);
        for pattern in patterns {
            let base = mem.0.as_mut_ptr();
            unsafe {
                write64le(base, 0, pattern);
                assert_eq!(read64be(base, 0), read64le(base, 0).swap_bytes());
                write32le(base, 4, pattern as u32);
                assert_eq!(read32be(base, 4), read32le(base, 4).swap_bytes());
            }
        }
    }

    #[test]
    fn test_writers_round_trip() {
        let mut mem = Words([0; 32]);
        let base = mem.0.as_mut_ptr();
        unsafe {
            write32be(base, 0, 0xaabb_ccdd);
            write64be(base, 8, 0x1122_3344_5566_7788);
            write64le(base, 16, 0x1122_3344_5566_7788);
            assert_eq!(read32be(base, 0), 0xaabb_ccdd);
            assert_eq!(read64be(base, 8), 0x1122_3344_5566_7788);
            assert_eq!(read64le(base, 16), 0x1122_3344_5566_7788);
        }
        assert_eq!(&mem.0[0..4], &[0xaa, 0xbb, 0xcc, 0xdd]);
        assert_eq!(mem.0[16], 0x88);
    }
}
