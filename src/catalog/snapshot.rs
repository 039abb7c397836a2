use serde::{Deserialize, Serialize};

use crate::catalog::level::MaskingLevel;
use crate::extractor::error::ExtractError;

/// A column with its masking level, ordered within its owning table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name, unique within the table.
    pub name: String,
    /// Masking level attached to the column.
    #[serde(default)]
    pub masking_level: MaskingLevel,
}

/// A table and its ordered column list.
///
/// Column order is significant: alias column lists bind positionally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name, unique within the schema.
    pub name: String,
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

/// A schema and its tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaInfo {
    /// Schema name. `public` is the default when a reference omits it.
    pub name: String,
    /// Tables in the schema.
    #[serde(default)]
    pub tables: Vec<TableSchema>,
}

/// A database and its schemas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    /// Database name.
    pub name: String,
    /// Schemas in the database.
    #[serde(default)]
    pub schemas: Vec<SchemaInfo>,
}

/// Read-only snapshot of every database visible to an extraction.
///
/// Lookup is a positional scan in declaration order; the snapshot assumes no
/// index. A snapshot is immutable and freely shareable between extractions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    /// Databases in the snapshot.
    #[serde(default)]
    pub databases: Vec<DatabaseInfo>,
}

/// A table found in the snapshot, with the database and schema it was found
/// under so base columns can be attributed.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedTable<'a> {
    /// Name of the owning database.
    pub database: &'a str,
    /// Name of the owning schema.
    pub schema: &'a str,
    /// The table itself.
    pub table: &'a TableSchema,
}

impl CatalogSnapshot {
    /// Find a table by schema and table name, case-sensitively.
    ///
    /// An empty `schema_name` matches any schema named `public`. The first
    /// match across the database sequence wins.
    pub fn find_table(
        &self,
        schema_name: &str,
        table_name: &str,
    ) -> Result<ResolvedTable<'_>, ExtractError> {
        for database in &self.databases {
            for schema in &database.schemas {
                let schema_matches = if schema_name.is_empty() {
                    schema.name == "public"
                } else {
                    schema.name == schema_name
                };
                if !schema_matches {
                    continue;
                }
                for table in &schema.tables {
                    if table.name == table_name {
                        return Ok(ResolvedTable {
                            database: &database.name,
                            schema: &schema.name,
                            table,
                        });
                    }
                }
            }
        }
        Err(ExtractError::table_not_found(schema_name, table_name))
    }
}
