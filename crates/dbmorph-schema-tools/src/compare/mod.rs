//! Schema comparison module
//!
//! Provides the comparator that turns two schema snapshots into typed edits.

mod comparator;
mod edit;

#[cfg(test)]
mod tests;

pub use comparator::*;
pub use edit::*;
