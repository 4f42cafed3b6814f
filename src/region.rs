use core::fmt;

/// A range of 64-bit addresses.
///
/// The range is inclusive on the start and exclusive on the end.
/// It is empty if `start >= end`; empty ranges never overlap anything.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryRegion {
    /// The lower bound of the range (inclusive).
    pub start: u64,
    /// The upper bound of the range (exclusive).
    pub end: u64,
}

impl MemoryRegion {
    /// Creates a new address range.
    #[inline]
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Creates a new address range from the start address and the size.
    ///
    /// Returns `None` if the end would not fit in 64 bits.
    #[inline]
    pub const fn from_start_size(start: u64, size: u64) -> Option<Self> {
        match start.checked_add(size) {
            Some(end) => Some(Self { start, end }),
            None => None,
        }
    }

    /// Returns `true` if the range is empty (`start >= end`).
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.start >= self.end
    }

    /// Returns the size of the range, `0` when empty.
    #[inline]
    pub const fn size(self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Checks if the range contains the given address.
    #[inline]
    pub const fn contains(self, addr: u64) -> bool {
        self.start <= addr && addr < self.end
    }

    /// Checks if the range overlaps with the given address range.
    #[inline]
    pub const fn overlaps(self, other: Self) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }
}

impl fmt::Debug for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#x}..{:#x}", self.start, self.end)
    }
}

/// Checks whether `[a_start, a_end)` and `[b_start, b_end)` intersect.
///
/// Total over all inputs: a range whose start is not below its end is empty
/// and overlaps nothing, itself included.
#[inline]
pub const fn overlaps(a_start: u64, a_end: u64, b_start: u64, b_end: u64) -> bool {
    let lo = if a_start > b_start { a_start } else { b_start };
    let hi = if a_end < b_end { a_end } else { b_end };
    lo < hi
}
