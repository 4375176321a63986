use std::{
    fs::File,
    io::{Seek, SeekFrom, Write},
    path::Path,
};

use tempfile::NamedTempFile;

use crate::types::{
    PageSize, Pgid,
    element::{BranchEntry, LeafEntry, branch_page_size, leaf_page_size},
    error::PageError,
    page::{Page, PageMut},
};

/// Zeroed staging buffer for page `id` spanning `1 + overflow` pages, with the
/// header id and overflow already set.
pub fn blank_page(page_size: PageSize, id: Pgid, overflow: u32) -> Vec<u8> {
    let mut buf = vec![0u8; page_size.extent(overflow)];
    if let Ok(mut page) = PageMut::new(&mut buf) {
        page.set_id(id);
        page.set_overflow(overflow);
    }
    buf
}

/// Leaf page `id` holding `entries`, grown into overflow pages as needed.
pub fn leaf_page(
    page_size: PageSize,
    id: Pgid,
    entries: &[LeafEntry<'_>],
) -> Result<Vec<u8>, PageError> {
    let overflow = page_size.overflow_for(leaf_page_size(entries));
    let mut buf = blank_page(page_size, id, overflow);
    PageMut::new(&mut buf)?.write_leaf(entries)?;
    Ok(buf)
}

/// Branch page `id` holding `entries`, grown into overflow pages as needed.
pub fn branch_page(
    page_size: PageSize,
    id: Pgid,
    entries: &[BranchEntry<'_>],
) -> Result<Vec<u8>, PageError> {
    let overflow = page_size.overflow_for(branch_page_size(entries));
    let mut buf = blank_page(page_size, id, overflow);
    PageMut::new(&mut buf)?.write_branch(entries)?;
    Ok(buf)
}

/// A database file in the temp directory, removed on drop.
pub struct TempPageFile {
    pub file: NamedTempFile,
    pub page_size: PageSize,
}

impl TempPageFile {
    pub fn new(page_size: PageSize) -> Result<Self, PageError> {
        let file = tempfile::Builder::new()
            .prefix("boltpage_test_")
            .suffix(".db")
            .tempfile()?;
        Ok(Self { file, page_size })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Writes a staged page buffer at the offset of its header id.
    pub fn write_page(&mut self, buf: &[u8]) -> Result<(), PageError> {
        let page = Page::new(buf)?;
        let file: &mut File = self.file.as_file_mut();
        file.seek(SeekFrom::Start(self.page_size.offset_of(page.id())))?;
        file.write_all(buf)?;
        file.flush()?;
        Ok(())
    }
}
