pub mod commands;

use std::{
    fmt::Write as _,
    io::{self, Write},
};

use serde::{Deserialize, Serialize};

use crate::{
    types::{
        Pgid,
        error::PageError,
        page::{Page, PageType},
    },
    utils::hash::calculate_page_checksum,
};

/// Human readable summary of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub id: Pgid,
    #[serde(rename = "type")]
    pub page_type: String,
    pub count: u16,
    pub overflow_count: u32,
    pub checksum: u32,
}

impl PageInfo {
    pub fn from_page(page: &Page<'_>) -> Self {
        Self {
            id: page.id(),
            page_type: page.type_name(),
            count: page.count(),
            overflow_count: page.overflow(),
            checksum: calculate_page_checksum(page),
        }
    }
}

/// Lower-case hex of the first `n` bytes of the page buffer.
///
/// Reads raw bytes without consulting the header, so malformed pages can be
/// inspected. Panics if `n` exceeds the buffer.
pub fn hex_string(page: &Page<'_>, n: usize) -> String {
    let bytes = &page.as_bytes()[..n];
    let mut out = String::with_capacity(n * 2);
    for byte in bytes {
        // writing to a String cannot fail
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Writes the first `n` bytes of the page as one line of hex to `out`.
pub fn dump<W: Write>(page: &Page<'_>, n: usize, out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", hex_string(page, n))
}

/// [`dump`] to stderr.
pub fn dump_stderr(page: &Page<'_>, n: usize) -> io::Result<()> {
    dump(page, n, &mut io::stderr().lock())
}

/// Printable ASCII as-is, anything else as `\xNN`.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if b.is_ascii_graphic() || b == b' ' {
            out.push(b as char);
        } else {
            let _ = write!(out, "\\x{:02x}", b);
        }
    }
    out
}

const OUT_OF_BOUNDS: &str = "<out of bounds>";

fn escape_or_mark(bytes: Option<&[u8]>) -> String {
    bytes.map_or_else(|| OUT_OF_BOUNDS.to_string(), escape_bytes)
}

/// One line per element of a branch or leaf page; empty for other types.
///
/// Keys and values whose stored range leaves the page print as
/// `<out of bounds>`. A directory that does not fit the page is an error.
pub fn describe_elements(page: &Page<'_>) -> Result<Vec<String>, PageError> {
    let lines = match page.page_type() {
        Some(PageType::Leaf) => page
            .try_leaf_elements()?
            .iter()
            .enumerate()
            .map(|(i, elem)| {
                let marker = if elem.is_bucket() { " [bucket]" } else { "" };
                format!(
                    "{:>5}: key=\"{}\" value=\"{}\"{}",
                    i,
                    escape_or_mark(elem.try_key()),
                    escape_or_mark(elem.try_value()),
                    marker
                )
            })
            .collect(),
        Some(PageType::Branch) => page
            .try_branch_elements()?
            .iter()
            .enumerate()
            .map(|(i, elem)| {
                format!(
                    "{:>5}: key=\"{}\" -> page {}",
                    i,
                    escape_or_mark(elem.try_key()),
                    elem.pgid()
                )
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(lines)
}
