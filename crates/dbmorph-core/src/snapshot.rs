//! JSON snapshot documents
//!
//! Snapshots are the persisted form of a [`Schema`]. Missing optional fields
//! take their defaults on load, so hand-written documents can stay short.

use std::fs;
use std::path::Path;

use crate::{Result, Schema};

/// Decodes a snapshot document
pub fn from_json(json: &str) -> Result<Schema> {
    let schema: Schema = serde_json::from_str(json)?;
    Ok(schema)
}

/// Encodes a schema as a pretty-printed snapshot document
pub fn to_json(schema: &Schema) -> Result<String> {
    Ok(serde_json::to_string_pretty(schema)?)
}

/// Reads a snapshot document from disk
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load(path: impl AsRef<Path>) -> Result<Schema> {
    let contents = fs::read_to_string(path.as_ref())?;
    let schema = from_json(&contents)?;
    tracing::debug!(
        database = %schema.database_name,
        tables = schema.tables.len(),
        views = schema.views.len(),
        "snapshot loaded"
    );
    Ok(schema)
}

/// Writes a snapshot document to disk
pub fn save(schema: &Schema, path: impl AsRef<Path>) -> Result<()> {
    let json = to_json(schema)?;
    fs::write(path.as_ref(), json)?;
    tracing::debug!(path = %path.as_ref().display(), "snapshot written");
    Ok(())
}
