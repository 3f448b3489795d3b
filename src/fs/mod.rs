//! Filesystem layer — the markdown tree, its JSON metadata mirror, and the
//! `main.md` sentinel document.
//!
//! [`store`] owns all writes to the tree (atomic temp-file-then-rename),
//! [`json_index`] mirrors per-file metadata into `files_index.json`, and
//! [`main_doc`] holds the canonical `main.md` skeleton and its section
//! operations.

pub mod json_index;
pub mod main_doc;
pub mod store;

pub use json_index::JsonIndex;
pub use store::{FileStore, WriteReceipt};
