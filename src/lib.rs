//! Annotate `PostgreSQL` query result columns with the masking levels of their source columns.
#![warn(missing_docs)]

/// MySQL DDL naming advisories (auto-increment column conventions).
pub mod advisor;
/// Read-only catalog snapshot: databases, schemas, tables, columns, masking levels.
pub mod catalog;
/// The sensitive field extractor: query analysis and masking-level propagation.
pub mod extractor;
