//! Schema validation module
//!
//! Provides the warning rules applied to edits and schemas, data type
//! classification, and input consistency checks.

mod consistency;
mod types;
mod validator;


pub use consistency::*;
pub use types::*;
pub use validator::*;
