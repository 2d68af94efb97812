//! Application facade over the store, rankings, and sync.

mod tracker_service;

pub use tracker_service::*;
