//! Roster CSV exchange and whole-document backups.

mod backup;
mod csv_codec;

pub use backup::*;
pub use csv_codec::*;
