//! The tracker document: the whole application state as one value, plus
//! the mutation API every store implementation routes through.

mod document_migrations;
mod document_model;
mod document_mutations;
mod document_traits;
mod memory_store;

pub use document_migrations::*;
pub use document_model::*;
pub use document_mutations::*;
pub use document_traits::*;
pub use memory_store::*;
