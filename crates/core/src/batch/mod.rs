//! Count (batch) aggregate logic.
//!
//! A batch groups the donations collected during one service. This module
//! owns the status enum, the cached-total recomputation, and the cash/check
//! partition. The donation set is always the source of truth; the cached
//! total is a projection.

pub mod totals;
pub mod types;

#[cfg(test)]
mod totals_props;

pub use totals::BatchTotals;
pub use types::{BatchPartition, BatchStatus, display_name};
