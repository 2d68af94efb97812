//! Client (athlete/trainer) domain models.

mod client_model;

pub use client_model::*;
