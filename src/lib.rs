//! Page layer of a single-file B+tree key/value store.
//!
//! Typed, zero-copy views over raw page buffers (`types::page`,
//! `types::element`), the freelist's sorted page-id merge (`types::pgids`),
//! and diagnostics for inspecting pages on disk (`inspect`, `storage`).

pub mod inspect;
pub mod storage;
pub mod types;
pub mod utils;
