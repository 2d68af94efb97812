//! Personal-best records and the best-record replacement policy.

mod record_model;

pub use record_model::*;
