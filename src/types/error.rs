use thiserror::Error;

use crate::types::Pgid;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Buffer too short: need {required} bytes, got {actual} bytes")]
    BufferTooShort { required: usize, actual: usize },

    #[error("Invalid page size: {0} (must be a power of two >= 1024)")]
    InvalidPageSize(usize),

    #[error("merge_into bad len {dst} < {a} + {b}")]
    CapacityViolation { dst: usize, a: usize, b: usize },

    #[error("Too many elements for one page: {0} (max 65535)")]
    TooManyElements(usize),

    #[error("Element {field} of {value} does not fit in 32 bits")]
    FieldOverflow { field: &'static str, value: usize },

    #[error("Corrupted page: page_id={id}, reason={reason}")]
    Corrupt { id: Pgid, reason: String },

    #[error("Page {id} out of range (file holds {page_count} pages)")]
    PageOutOfRange { id: Pgid, page_count: u64 },

    #[error("Page {id} needs {required} bytes but only {available} remain in file")]
    PageTooLarge {
        id: Pgid,
        required: usize,
        available: u64,
    },

    #[error("Page {id} is a {actual} page, expected {expected}")]
    UnexpectedPageType {
        id: Pgid,
        expected: &'static str,
        actual: String,
    },
}

pub type Result<T> = std::result::Result<T, PageError>;
