//! Migration planning and application
//!
//! Turns comparator edits into an ordered, staged plan of MySQL statements,
//! renders it as a script, applies it through a [`StatementExecutor`] or
//! simulates it against an in-memory schema.
//!
//! [`StatementExecutor`]: dbmorph_core::StatementExecutor

mod apply;
mod planner;
mod render;
mod simulate;
mod stage;


pub use apply::*;
pub use planner::*;
pub use render::*;
pub use simulate::*;
pub use stage::*;
