//! Server sync: status signalling, the transport seam, and the reconciler.

mod sync_model;
mod sync_reconciler;
mod sync_scheduler;
mod sync_traits;

pub use sync_model::*;
pub use sync_reconciler::*;
pub use sync_scheduler::*;
pub use sync_traits::*;

#[cfg(test)]
mod tests;
