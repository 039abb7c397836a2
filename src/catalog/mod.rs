/// The ordered masking-level classification attached to catalog columns.
pub mod level;
/// Catalog snapshot types and table lookup.
pub mod snapshot;

pub use level::MaskingLevel;
pub use snapshot::{
    CatalogSnapshot, ColumnInfo, DatabaseInfo, ResolvedTable, SchemaInfo, TableSchema,
};
