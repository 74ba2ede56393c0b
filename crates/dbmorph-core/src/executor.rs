//! Statement executor boundary
//!
//! The planner produces statements; something outside the core sends them to
//! a server. This trait is that seam. Drivers implement it, tests implement it
//! with an in-memory recorder.

use async_trait::async_trait;

use crate::Result;

/// Applies one DDL statement at a time
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    /// Executes a single statement, returning the driver's error detail on failure
    async fn execute(&self, statement: &str) -> Result<()>;

    /// Short name of the backend, used in log output
    fn backend_name(&self) -> &str {
        "unknown"
    }
}
