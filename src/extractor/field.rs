use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::MaskingLevel;

/// A base-table column contributing to a query result.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnResource {
    /// Owning database.
    pub database: String,
    /// Owning schema.
    pub schema: String,
    /// Owning table.
    pub table: String,
    /// Column name.
    pub column: String,
}

/// A result column of an analyzed query, with the base columns feeding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpanResult {
    /// Result column name.
    pub name: String,
    /// Base columns contributing to this result.
    pub source_columns: BTreeSet<ColumnResource>,
}

/// The span of a whole query: its result columns and every base column any
/// of them touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpan {
    /// Result columns in output order.
    pub results: Vec<QuerySpanResult>,
    /// Union of the result columns' sources.
    pub source_columns: BTreeSet<ColumnResource>,
}

impl QuerySpan {
    /// Assemble a span from per-result entries.
    pub fn new(results: Vec<QuerySpanResult>) -> Self {
        let source_columns = results
            .iter()
            .flat_map(|result| result.source_columns.iter().cloned())
            .collect();
        QuerySpan {
            results,
            source_columns,
        }
    }
}

/// A result column paired with its final masking level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitiveColumn {
    /// Result column name.
    pub name: String,
    /// Maximum masking level over the column's contributors.
    pub masking_level: MaskingLevel,
}

/// Transient record for one column produced while walking a query.
///
/// `schema` and `table` may be empty for computed or unaliased outputs; the
/// resolver treats them as wildcards per its matching rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Schema the field is visible under (often empty).
    pub schema: String,
    /// Table or alias the field is visible under (may be empty).
    pub table: String,
    /// Field name.
    pub name: String,
    /// Masking level accumulated so far.
    pub masking_level: MaskingLevel,
    /// Base columns contributing to the field.
    pub sources: BTreeSet<ColumnResource>,
}

impl FieldInfo {
    /// A computed field with no table attribution.
    pub fn computed(
        name: impl Into<String>,
        masking_level: MaskingLevel,
        sources: BTreeSet<ColumnResource>,
    ) -> Self {
        FieldInfo {
            schema: String::new(),
            table: String::new(),
            name: name.into(),
            masking_level,
            sources,
        }
    }
}
