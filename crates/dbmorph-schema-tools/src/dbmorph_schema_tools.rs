//! dbmorph schema tools - comparison, validation and migration planning
//!
//! This crate provides:
//! - Input consistency checks and safety warnings for schema changes
//! - Comparison of two schema snapshots into a typed edit list
//! - Staged, deterministic migration plans and their SQL rendering
//! - Plan application through an executor, and dry runs

pub mod compare;
pub mod migration;
pub mod validate;

pub use compare::*;
pub use migration::*;
pub use validate::*;
