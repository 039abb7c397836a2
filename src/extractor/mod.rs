/// Error taxonomy for query extraction.
pub mod error;
/// Extractor state, entry points, and the column name resolver.
pub mod extract;
/// Transient field records and query-span output types.
pub mod field;
/// Identifier normalization, column-reference decomposition, derived names.
pub mod names;

mod expr;
mod range;
mod select;

pub use error::ExtractError;
pub use extract::{SensitiveFieldExtractor, SYSTEM_SCHEMAS};
pub use field::{ColumnResource, FieldInfo, QuerySpan, QuerySpanResult, SensitiveColumn};
