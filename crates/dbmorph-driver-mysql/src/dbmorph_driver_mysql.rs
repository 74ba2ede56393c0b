//! MySQL driver for dbmorph
//!
//! Reads a live database into a [`dbmorph_core::Schema`] and applies
//! migration statements through [`dbmorph_core::StatementExecutor`].

mod connection;
mod schema;

pub use connection::{ConnectionParams, MySqlConnection};
pub use schema::{ExtractOptions, charset_from_collation};
