use std::fmt;

use crate::types::{
    BRANCH_PAGE_FLAG, FREELIST_COUNT_OVERFLOW, FREELIST_PAGE_FLAG, LEAF_PAGE_FLAG, META_PAGE_FLAG,
    PAGE_HEADER_SIZE, PGID_SIZE, Pgid,
    element::{
        BranchElements, BranchEntry, BranchPageElement, Elements, LeafElements, LeafEntry,
        LeafPageElement, NodeElement, branch_page_size, leaf_page_size, read_u16, read_u32,
        read_u64,
    },
    error::PageError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    Branch,
    Leaf,
    Meta,
    Freelist,
}

impl PageType {
    /// Picks the first recognized bit in branch, leaf, meta, freelist order.
    pub fn from_flags(flags: u16) -> Option<Self> {
        if flags & BRANCH_PAGE_FLAG != 0 {
            Some(PageType::Branch)
        } else if flags & LEAF_PAGE_FLAG != 0 {
            Some(PageType::Leaf)
        } else if flags & META_PAGE_FLAG != 0 {
            Some(PageType::Meta)
        } else if flags & FREELIST_PAGE_FLAG != 0 {
            Some(PageType::Freelist)
        } else {
            None
        }
    }

    pub fn flag(&self) -> u16 {
        match self {
            PageType::Branch => BRANCH_PAGE_FLAG,
            PageType::Leaf => LEAF_PAGE_FLAG,
            PageType::Meta => META_PAGE_FLAG,
            PageType::Freelist => FREELIST_PAGE_FLAG,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PageType::Branch => "branch",
            PageType::Leaf => "leaf",
            PageType::Meta => "meta",
            PageType::Freelist => "freelist",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Human readable type of a raw flag value, `unknown<xx>` when no known bit is set.
pub fn type_name(flags: u16) -> String {
    match PageType::from_flags(flags) {
        Some(page_type) => page_type.name().to_string(),
        None => format!("unknown<{:02x}>", flags),
    }
}

/*
 * Page Layout (little-endian)
 * ┌─────────────────────────────────────────────────────────────────┐
 * │                    PAGE HEADER (16 bytes)                       │
 * │  id(8) | flags(2) | count(2) | overflow(4)                      │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                    PAGE DATA                                    │
 * │  branch/leaf: element directory + key/value bytes               │
 * │  freelist:    [real count(8) if count == 0xFFFF] pgid(8) ...    │
 * │  meta:        owned by the transaction layer                    │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                    OVERFLOW PAGES (overflow * page size)        │
 * └─────────────────────────────────────────────────────────────────┘
 */

/// Read-only view of a page over a borrowed buffer.
///
/// The buffer is the page together with its overflow run. Construction is the
/// only checked step; accessors trust the header.
#[derive(Clone, Copy)]
pub struct Page<'a> {
    buf: &'a [u8],
}

impl<'a> Page<'a> {
    pub fn new(buf: &'a [u8]) -> Result<Self, PageError> {
        if buf.len() < PAGE_HEADER_SIZE {
            return Err(PageError::BufferTooShort {
                required: PAGE_HEADER_SIZE,
                actual: buf.len(),
            });
        }
        Ok(Self { buf })
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    pub fn id(&self) -> Pgid {
        read_u64(self.buf, 0)
    }

    pub fn flags(&self) -> u16 {
        read_u16(self.buf, 8)
    }

    pub fn count(&self) -> u16 {
        read_u16(self.buf, 10)
    }

    pub fn overflow(&self) -> u32 {
        read_u32(self.buf, 12)
    }

    pub fn page_type(&self) -> Option<PageType> {
        PageType::from_flags(self.flags())
    }

    pub fn type_name(&self) -> String {
        type_name(self.flags())
    }

    pub fn is_branch(&self) -> bool {
        self.flags() & BRANCH_PAGE_FLAG != 0
    }

    pub fn is_leaf(&self) -> bool {
        self.flags() & LEAF_PAGE_FLAG != 0
    }

    pub fn is_meta(&self) -> bool {
        self.flags() & META_PAGE_FLAG != 0
    }

    pub fn is_freelist(&self) -> bool {
        self.flags() & FREELIST_PAGE_FLAG != 0
    }

    /// Bytes following the header, interpreted by meta and freelist formats.
    pub fn data(&self) -> &'a [u8] {
        &self.buf[PAGE_HEADER_SIZE..]
    }

    /// The `index`th leaf element.
    ///
    /// # Panics
    ///
    /// Panics if `index >= count()`.
    pub fn leaf_element(&self, index: u16) -> LeafPageElement<'a> {
        self.element_at(index)
    }

    pub fn leaf_elements(&self) -> LeafElements<'a> {
        Elements::new(self.buf, self.count() as usize)
    }

    /// The `index`th branch element.
    ///
    /// # Panics
    ///
    /// Panics if `index >= count()`.
    pub fn branch_element(&self, index: u16) -> BranchPageElement<'a> {
        self.element_at(index)
    }

    pub fn branch_elements(&self) -> BranchElements<'a> {
        Elements::new(self.buf, self.count() as usize)
    }

    /// [`leaf_elements`](Self::leaf_elements), failing when the directory
    /// runs past the buffer.
    pub fn try_leaf_elements(&self) -> Result<LeafElements<'a>, PageError> {
        self.checked_elements()
    }

    /// [`branch_elements`](Self::branch_elements), failing when the directory
    /// runs past the buffer.
    pub fn try_branch_elements(&self) -> Result<BranchElements<'a>, PageError> {
        self.checked_elements()
    }

    fn checked_elements<E: NodeElement<'a>>(&self) -> Result<Elements<'a, E>, PageError> {
        let count = self.count() as usize;
        if E::offset_of(count) > self.buf.len() {
            return Err(self.corrupt(format!(
                "{} elements need {} bytes, page holds {}",
                count,
                E::offset_of(count),
                self.buf.len()
            )));
        }
        Ok(Elements::new(self.buf, count))
    }

    fn element_at<E: NodeElement<'a>>(&self, index: u16) -> E {
        let count = self.count();
        assert!(
            index < count,
            "element index {} out of bounds for page {} with {} elements",
            index,
            self.id(),
            count
        );
        E::at(self.buf, E::offset_of(index as usize))
    }

    /// Number of ids stored on a freelist page.
    pub fn freelist_len(&self) -> usize {
        match self.count() {
            FREELIST_COUNT_OVERFLOW => read_u64(self.buf, PAGE_HEADER_SIZE) as usize,
            count => count as usize,
        }
    }

    /// Decodes the page ids stored on a freelist page, in stored order.
    pub fn freelist_ids(&self) -> FreelistIds<'a> {
        let start = if self.count() == FREELIST_COUNT_OVERFLOW {
            PAGE_HEADER_SIZE + PGID_SIZE
        } else {
            PAGE_HEADER_SIZE
        };
        FreelistIds {
            buf: self.buf,
            offset: start,
            remaining: self.freelist_len(),
        }
    }

    /// [`freelist_ids`](Self::freelist_ids), failing when the stored length
    /// runs past the buffer.
    pub fn try_freelist_ids(&self) -> Result<FreelistIds<'a>, PageError> {
        let (start, stored) = if self.count() == FREELIST_COUNT_OVERFLOW {
            let start = PAGE_HEADER_SIZE + PGID_SIZE;
            if start > self.buf.len() {
                return Err(self.corrupt("missing freelist length slot".to_string()));
            }
            (start, read_u64(self.buf, PAGE_HEADER_SIZE))
        } else {
            (PAGE_HEADER_SIZE, self.count() as u64)
        };

        let fits = usize::try_from(stored).ok().filter(|&len| {
            len.checked_mul(PGID_SIZE)
                .and_then(|bytes| bytes.checked_add(start))
                .is_some_and(|end| end <= self.buf.len())
        });
        match fits {
            Some(len) => Ok(FreelistIds {
                buf: self.buf,
                offset: start,
                remaining: len,
            }),
            None => Err(self.corrupt(format!(
                "freelist length {} exceeds page of {} bytes",
                stored,
                self.buf.len()
            ))),
        }
    }

    fn corrupt(&self, reason: String) -> PageError {
        PageError::Corrupt {
            id: self.id(),
            reason,
        }
    }
}

impl fmt::Debug for Page<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.id())
            .field("type", &self.type_name())
            .field("count", &self.count())
            .field("overflow", &self.overflow())
            .finish()
    }
}

/// Orders page handles by id, ascending.
pub fn sort_by_id(pages: &mut [Page<'_>]) {
    pages.sort_by_key(|p| p.id());
}

pub struct FreelistIds<'a> {
    buf: &'a [u8],
    offset: usize,
    remaining: usize,
}

impl Iterator for FreelistIds<'_> {
    type Item = Pgid;

    fn next(&mut self) -> Option<Pgid> {
        if self.remaining == 0 {
            return None;
        }
        let id = read_u64(self.buf, self.offset);
        self.offset += PGID_SIZE;
        self.remaining -= 1;
        Some(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for FreelistIds<'_> {}

/// Writable view of a staging buffer owned by the single writer.
pub struct PageMut<'a> {
    buf: &'a mut [u8],
}

impl<'a> PageMut<'a> {
    pub fn new(buf: &'a mut [u8]) -> Result<Self, PageError> {
        if buf.len() < PAGE_HEADER_SIZE {
            return Err(PageError::BufferTooShort {
                required: PAGE_HEADER_SIZE,
                actual: buf.len(),
            });
        }
        Ok(Self { buf })
    }

    pub fn as_page(&self) -> Page<'_> {
        Page { buf: &self.buf[..] }
    }

    pub fn set_id(&mut self, id: Pgid) {
        self.buf[0..8].copy_from_slice(&id.to_le_bytes());
    }

    pub fn set_flags(&mut self, flags: u16) {
        self.buf[8..10].copy_from_slice(&flags.to_le_bytes());
    }

    pub fn set_count(&mut self, count: u16) {
        self.buf[10..12].copy_from_slice(&count.to_le_bytes());
    }

    pub fn set_overflow(&mut self, overflow: u32) {
        self.buf[12..16].copy_from_slice(&overflow.to_le_bytes());
    }

    /// Packs `entries` as a leaf node: directory first, then each key
    /// immediately followed by its value. Sets the leaf flag and count.
    ///
    /// Entries are written in the given order; keeping them sorted is the
    /// caller's job.
    pub fn write_leaf(&mut self, entries: &[LeafEntry<'_>]) -> Result<(), PageError> {
        let count = self.check_node_fits(entries.len(), leaf_page_size(entries))?;

        let mut data_offset = LeafPageElement::offset_of(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let elem = LeafPageElement::offset_of(index);
            let pos = size_field(data_offset - elem, "pos")?;
            let ksize = size_field(entry.key.len(), "ksize")?;
            let vsize = size_field(entry.value.len(), "vsize")?;
            self.buf[elem..elem + 4].copy_from_slice(&entry.flags.to_le_bytes());
            self.buf[elem + 4..elem + 8].copy_from_slice(&pos.to_le_bytes());
            self.buf[elem + 8..elem + 12].copy_from_slice(&ksize.to_le_bytes());
            self.buf[elem + 12..elem + 16].copy_from_slice(&vsize.to_le_bytes());

            self.buf[data_offset..data_offset + entry.key.len()].copy_from_slice(entry.key);
            data_offset += entry.key.len();
            self.buf[data_offset..data_offset + entry.value.len()].copy_from_slice(entry.value);
            data_offset += entry.value.len();
        }
        self.set_flags(LEAF_PAGE_FLAG);
        self.set_count(count);
        Ok(())
    }

    /// Packs `entries` as a branch node. Sets the branch flag and count.
    pub fn write_branch(&mut self, entries: &[BranchEntry<'_>]) -> Result<(), PageError> {
        let count = self.check_node_fits(entries.len(), branch_page_size(entries))?;

        let mut data_offset = BranchPageElement::offset_of(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let elem = BranchPageElement::offset_of(index);
            let pos = size_field(data_offset - elem, "pos")?;
            let ksize = size_field(entry.key.len(), "ksize")?;
            self.buf[elem..elem + 4].copy_from_slice(&pos.to_le_bytes());
            self.buf[elem + 4..elem + 8].copy_from_slice(&ksize.to_le_bytes());
            self.buf[elem + 8..elem + 16].copy_from_slice(&entry.pgid.to_le_bytes());

            self.buf[data_offset..data_offset + entry.key.len()].copy_from_slice(entry.key);
            data_offset += entry.key.len();
        }
        self.set_flags(BRANCH_PAGE_FLAG);
        self.set_count(count);
        Ok(())
    }

    /// Writes `ids` as a freelist page. Lists of 0xFFFF ids or more keep the
    /// real count in the first id slot.
    pub fn write_freelist(&mut self, ids: &[Pgid]) -> Result<(), PageError> {
        let spill = ids.len() >= FREELIST_COUNT_OVERFLOW as usize;
        let mut offset = PAGE_HEADER_SIZE;
        let required = offset + (ids.len() + usize::from(spill)) * PGID_SIZE;
        if required > self.buf.len() {
            return Err(PageError::BufferTooShort {
                required,
                actual: self.buf.len(),
            });
        }

        self.set_flags(FREELIST_PAGE_FLAG);
        if spill {
            self.set_count(FREELIST_COUNT_OVERFLOW);
            self.buf[offset..offset + PGID_SIZE].copy_from_slice(&(ids.len() as u64).to_le_bytes());
            offset += PGID_SIZE;
        } else {
            self.set_count(ids.len() as u16);
        }
        for id in ids {
            self.buf[offset..offset + PGID_SIZE].copy_from_slice(&id.to_le_bytes());
            offset += PGID_SIZE;
        }
        Ok(())
    }

    fn check_node_fits(&self, len: usize, required: usize) -> Result<u16, PageError> {
        let count = u16::try_from(len).map_err(|_| PageError::TooManyElements(len))?;
        if required > self.buf.len() {
            return Err(PageError::BufferTooShort {
                required,
                actual: self.buf.len(),
            });
        }
        Ok(count)
    }
}

/// Element offsets and lengths are stored as u32.
fn size_field(value: usize, field: &'static str) -> Result<u32, PageError> {
    u32::try_from(value).map_err(|_| PageError::FieldOverflow { field, value })
}
