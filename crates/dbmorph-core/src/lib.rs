//! dbmorph core - schema model and shared abstractions
//!
//! This crate provides the types every other dbmorph crate depends on:
//!
//! - `Schema` and its entities (tables, columns, indexes, foreign keys,
//!   views, routines, triggers)
//! - `Warning` with its category, severity and `EntityRef`
//! - `MorphError`, the error taxonomy shared across crates
//! - `StatementExecutor`, the boundary to a live database
//! - JSON snapshot encoding in the `snapshot` module

mod error;
mod executor;
mod schema;
pub mod snapshot;
mod warning;


pub use error::*;
pub use executor::*;
pub use schema::*;
pub use warning::*;
