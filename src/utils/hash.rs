use crc32fast::Hasher;

use crate::types::page::Page;

/// CRC32 of the header fields followed by the page data.
pub fn calculate_page_checksum(page: &Page<'_>) -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&page.id().to_le_bytes());
    hasher.update(&page.flags().to_le_bytes());
    hasher.update(&page.count().to_le_bytes());
    hasher.update(&page.overflow().to_le_bytes());
    hasher.update(page.data());

    hasher.finalize()
}

pub fn verify_page_checksum(page: &Page<'_>, expected_checksum: u32) -> bool {
    calculate_page_checksum(page) == expected_checksum
}
