//! Per-tab content rendering.

pub mod audit;
pub mod documents;
pub mod shares;
