use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::types::{PAGE_HEADER_SIZE, PageSize, Pgid, error::PageError, page::Page};

/// Read-only access to the pages of a database file.
///
/// Page `id` starts at byte `id * page_size`; a page and its overflow run are
/// read together into one owned buffer.
pub struct PageReader {
    path: PathBuf,
    file: File,
    page_size: PageSize,
    file_size: u64,
}

impl PageReader {
    pub fn open<P: AsRef<Path>>(path: P, page_size: PageSize) -> Result<Self, PageError> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).open(path)?;
        let file_size = file.metadata()?.len();
        if file_size % page_size.get() as u64 != 0 {
            warn!(
                "{} is {} bytes, not a multiple of the {} byte page size",
                path.display(),
                file_size,
                page_size.get()
            );
        }
        debug!("Opened {} ({} bytes)", path.display(), file_size);
        Ok(Self {
            path: path.to_path_buf(),
            file,
            page_size,
            file_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Whole pages in the file.
    pub fn page_count(&self) -> u64 {
        self.file_size / self.page_size.get() as u64
    }

    /// Reads page `id` including its overflow pages.
    pub fn read_page(&mut self, id: Pgid) -> Result<Vec<u8>, PageError> {
        let page_count = self.page_count();
        if id >= page_count {
            return Err(PageError::PageOutOfRange { id, page_count });
        }
        let offset = self.page_size.offset_of(id);

        let mut header = [0u8; PAGE_HEADER_SIZE];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut header)?;
        let overflow = Page::new(&header)?.overflow();

        let required = self.page_size.extent(overflow);
        let available = self.file_size - offset;
        if required as u64 > available {
            return Err(PageError::PageTooLarge {
                id,
                required,
                available,
            });
        }

        let mut buffer = vec![0u8; required];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut buffer)?;
        debug!("Read page {} ({} overflow pages)", id, overflow);
        Ok(buffer)
    }
}
