pub mod element;
pub mod error;
pub mod page;
pub mod pgids;

// Common type aliases
pub type Pgid = u64;

// Page geometry
pub const DEFAULT_PAGE_SIZE: usize = 4096;
pub const MIN_PAGE_SIZE: usize = 1024;
pub const PAGE_HEADER_SIZE: usize = 16; // id(8) | flags(2) | count(2) | overflow(4)
pub const BRANCH_PAGE_ELEMENT_SIZE: usize = 16; // pos(4) | ksize(4) | pgid(8)
pub const LEAF_PAGE_ELEMENT_SIZE: usize = 16; // flags(4) | pos(4) | ksize(4) | vsize(4)
pub const PGID_SIZE: usize = 8;

pub const MIN_KEYS_PER_PAGE: usize = 2;

// Page-level type flags
pub const BRANCH_PAGE_FLAG: u16 = 0x01;
pub const LEAF_PAGE_FLAG: u16 = 0x02;
pub const META_PAGE_FLAG: u16 = 0x04;
pub const FREELIST_PAGE_FLAG: u16 = 0x10;

// Leaf element flags, separate namespace from page flags
pub const BUCKET_LEAF_FLAG: u32 = 0x01;

/// A freelist page whose id count does not fit in the header stores this
/// sentinel in `count` and the real count in the first id slot.
pub const FREELIST_COUNT_OVERFLOW: u16 = 0xFFFF;

/// Validated page size: a power of two no smaller than [`MIN_PAGE_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize(usize);

impl PageSize {
    pub fn new(size: usize) -> Result<Self, error::PageError> {
        if size < MIN_PAGE_SIZE || !size.is_power_of_two() {
            return Err(error::PageError::InvalidPageSize(size));
        }
        Ok(Self(size))
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// Byte offset of page `id` in the backing file.
    pub fn offset_of(self, id: Pgid) -> u64 {
        id * self.0 as u64
    }

    /// Bytes spanned by a page together with its overflow run.
    pub fn extent(self, overflow: u32) -> usize {
        self.0 * (1 + overflow as usize)
    }

    /// Overflow pages needed to hold `len` bytes.
    pub fn overflow_for(self, len: usize) -> u32 {
        (len.max(1).div_ceil(self.0) - 1) as u32
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self(DEFAULT_PAGE_SIZE)
    }
}
