use std::{fmt, iter::FusedIterator, marker::PhantomData};

use crate::types::{
    BRANCH_PAGE_ELEMENT_SIZE, BUCKET_LEAF_FLAG, LEAF_PAGE_ELEMENT_SIZE, PAGE_HEADER_SIZE, Pgid,
};

/*
 * Node Element Layout
 * ┌──────────────────────────────────────────────────────────────┐
 * │ PAGE HEADER (16 bytes)                                       │
 * ├──────────────────────────────────────────────────────────────┤
 * │ ELEMENT DIRECTORY (count * 16 bytes)                         │
 * │  branch: pos(4) | ksize(4) | pgid(8)                         │
 * │  leaf:   flags(4) | pos(4) | ksize(4) | vsize(4)             │
 * ├──────────────────────────────────────────────────────────────┤
 * │ KEY / VALUE BYTES                                            │
 * │  [key0][value0][key1][value1] ...                            │
 * └──────────────────────────────────────────────────────────────┘
 *
 * `pos` is measured from the element's own directory entry, not from
 * the start of the page.
 */

pub(crate) fn read_u16(buf: &[u8], offset: usize) -> u16 {
    let mut bytes = [0u8; 2];
    bytes.copy_from_slice(&buf[offset..offset + 2]);
    u16::from_le_bytes(bytes)
}

pub(crate) fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

pub(crate) fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

/// `len` bytes starting `pos` bytes past `offset`, or `None` if that range
/// leaves the buffer.
fn checked_slice(page: &[u8], offset: usize, pos: usize, len: usize) -> Option<&[u8]> {
    let start = offset.checked_add(pos)?;
    page.get(start..start.checked_add(len)?)
}

/// A fixed-size directory entry that lives inside a node page.
pub trait NodeElement<'a>: Copy {
    const SIZE: usize;

    /// Views the entry at byte `offset` of `page`.
    fn at(page: &'a [u8], offset: usize) -> Self;

    /// Byte offset of the `index`th entry from the start of the page.
    fn offset_of(index: usize) -> usize {
        PAGE_HEADER_SIZE + index * Self::SIZE
    }
}

/// Directory entry of a branch page: a key and the child page it routes to.
#[derive(Clone, Copy)]
pub struct BranchPageElement<'a> {
    page: &'a [u8],
    offset: usize,
}

impl<'a> BranchPageElement<'a> {
    pub fn pos(&self) -> u32 {
        read_u32(self.page, self.offset)
    }

    pub fn ksize(&self) -> u32 {
        read_u32(self.page, self.offset + 4)
    }

    pub fn pgid(&self) -> Pgid {
        read_u64(self.page, self.offset + 8)
    }

    /// Zero-copy view of the key bytes.
    pub fn key(&self) -> &'a [u8] {
        let start = self.offset + self.pos() as usize;
        &self.page[start..start + self.ksize() as usize]
    }

    /// Like [`key`](Self::key) but `None` when the stored range leaves the page.
    pub fn try_key(&self) -> Option<&'a [u8]> {
        checked_slice(self.page, self.offset, self.pos() as usize, self.ksize() as usize)
    }
}

impl<'a> NodeElement<'a> for BranchPageElement<'a> {
    const SIZE: usize = BRANCH_PAGE_ELEMENT_SIZE;

    fn at(page: &'a [u8], offset: usize) -> Self {
        Self { page, offset }
    }
}

/// Directory entry of a leaf page: a key, its value and the element flags.
#[derive(Clone, Copy)]
pub struct LeafPageElement<'a> {
    page: &'a [u8],
    offset: usize,
}

impl<'a> LeafPageElement<'a> {
    pub fn flags(&self) -> u32 {
        read_u32(self.page, self.offset)
    }

    pub fn pos(&self) -> u32 {
        read_u32(self.page, self.offset + 4)
    }

    pub fn ksize(&self) -> u32 {
        read_u32(self.page, self.offset + 8)
    }

    pub fn vsize(&self) -> u32 {
        read_u32(self.page, self.offset + 12)
    }

    /// True when the value is a nested bucket reference rather than plain data.
    pub fn is_bucket(&self) -> bool {
        self.flags() & BUCKET_LEAF_FLAG != 0
    }

    /// Zero-copy view of the key bytes.
    pub fn key(&self) -> &'a [u8] {
        let start = self.offset + self.pos() as usize;
        &self.page[start..start + self.ksize() as usize]
    }

    /// Zero-copy view of the value bytes, which follow the key directly.
    pub fn value(&self) -> &'a [u8] {
        let start = self.offset + self.pos() as usize + self.ksize() as usize;
        &self.page[start..start + self.vsize() as usize]
    }

    /// Like [`key`](Self::key) but `None` when the stored range leaves the page.
    pub fn try_key(&self) -> Option<&'a [u8]> {
        checked_slice(self.page, self.offset, self.pos() as usize, self.ksize() as usize)
    }

    /// Like [`value`](Self::value) but `None` when the stored range leaves the page.
    pub fn try_value(&self) -> Option<&'a [u8]> {
        let pos = (self.pos() as usize).checked_add(self.ksize() as usize)?;
        checked_slice(self.page, self.offset, pos, self.vsize() as usize)
    }
}

impl<'a> NodeElement<'a> for LeafPageElement<'a> {
    const SIZE: usize = LEAF_PAGE_ELEMENT_SIZE;

    fn at(page: &'a [u8], offset: usize) -> Self {
        Self { page, offset }
    }
}

// Two element views are the same element when they point at the same entry of
// the same buffer.
impl PartialEq for BranchPageElement<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.page.as_ptr(), other.page.as_ptr()) && self.offset == other.offset
    }
}

impl Eq for BranchPageElement<'_> {}

impl PartialEq for LeafPageElement<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.page.as_ptr(), other.page.as_ptr()) && self.offset == other.offset
    }
}

impl Eq for LeafPageElement<'_> {}

impl fmt::Debug for BranchPageElement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BranchPageElement")
            .field("pos", &self.pos())
            .field("ksize", &self.ksize())
            .field("pgid", &self.pgid())
            .finish()
    }
}

impl fmt::Debug for LeafPageElement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafPageElement")
            .field("flags", &self.flags())
            .field("pos", &self.pos())
            .field("ksize", &self.ksize())
            .field("vsize", &self.vsize())
            .finish()
    }
}

/// Zero-copy sequence of the `count` directory entries of a node page.
pub struct Elements<'a, E> {
    page: &'a [u8],
    len: usize,
    _marker: PhantomData<E>,
}

impl<'a, E: NodeElement<'a>> Elements<'a, E> {
    pub(crate) fn new(page: &'a [u8], len: usize) -> Self {
        Self {
            page,
            len,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<E> {
        if index < self.len {
            Some(E::at(self.page, E::offset_of(index)))
        } else {
            None
        }
    }

    pub fn first(&self) -> Option<E> {
        self.get(0)
    }

    pub fn last(&self) -> Option<E> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> ElementsIter<'a, E> {
        ElementsIter {
            page: self.page,
            front: 0,
            back: self.len,
            _marker: PhantomData,
        }
    }
}

impl<E> Clone for Elements<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Elements<'_, E> {}

impl<'a, E: NodeElement<'a> + fmt::Debug> fmt::Debug for Elements<'a, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, E: NodeElement<'a>> IntoIterator for Elements<'a, E> {
    type Item = E;
    type IntoIter = ElementsIter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct ElementsIter<'a, E> {
    page: &'a [u8],
    front: usize,
    back: usize,
    _marker: PhantomData<E>,
}

impl<'a, E: NodeElement<'a>> Iterator for ElementsIter<'a, E> {
    type Item = E;

    fn next(&mut self) -> Option<E> {
        if self.front >= self.back {
            return None;
        }
        let element = E::at(self.page, E::offset_of(self.front));
        self.front += 1;
        Some(element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<'a, E: NodeElement<'a>> DoubleEndedIterator for ElementsIter<'a, E> {
    fn next_back(&mut self) -> Option<E> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(E::at(self.page, E::offset_of(self.back)))
    }
}

impl<'a, E: NodeElement<'a>> ExactSizeIterator for ElementsIter<'a, E> {}

impl<'a, E: NodeElement<'a>> FusedIterator for ElementsIter<'a, E> {}

pub type BranchElements<'a> = Elements<'a, BranchPageElement<'a>>;
pub type LeafElements<'a> = Elements<'a, LeafPageElement<'a>>;

/// A key/value pair to be packed into a leaf page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafEntry<'k> {
    pub flags: u32,
    pub key: &'k [u8],
    pub value: &'k [u8],
}

impl<'k> LeafEntry<'k> {
    pub fn new(key: &'k [u8], value: &'k [u8]) -> Self {
        Self {
            flags: 0,
            key,
            value,
        }
    }

    pub fn bucket(key: &'k [u8], value: &'k [u8]) -> Self {
        Self {
            flags: BUCKET_LEAF_FLAG,
            key,
            value,
        }
    }
}

/// A key/child pair to be packed into a branch page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchEntry<'k> {
    pub key: &'k [u8],
    pub pgid: Pgid,
}

impl<'k> BranchEntry<'k> {
    pub fn new(key: &'k [u8], pgid: Pgid) -> Self {
        Self { key, pgid }
    }
}

/// Bytes needed to hold a leaf page with `entries`, header included.
pub fn leaf_page_size(entries: &[LeafEntry<'_>]) -> usize {
    PAGE_HEADER_SIZE
        + entries
            .iter()
            .map(|e| LEAF_PAGE_ELEMENT_SIZE + e.key.len() + e.value.len())
            .sum::<usize>()
}

/// Bytes needed to hold a branch page with `entries`, header included.
pub fn branch_page_size(entries: &[BranchEntry<'_>]) -> usize {
    PAGE_HEADER_SIZE
        + entries
            .iter()
            .map(|e| BRANCH_PAGE_ELEMENT_SIZE + e.key.len())
            .sum::<usize>()
}
