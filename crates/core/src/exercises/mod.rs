//! Exercise domain models and the fixed category list.

mod exercise_model;

pub use exercise_model::*;
