//! JSON-file persistence for the tracker document.
//!
//! The whole document lives in one file next to the executable's data
//! directory. Every mutation rewrites it through an atomic
//! temp-file-and-rename, so a power cut mid-save leaves either the old
//! file or the new one, never a torn half of each.

mod json_store;

pub use json_store::*;
