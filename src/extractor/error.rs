use thiserror::Error;

/// Everything that can go wrong while extracting sensitive fields.
///
/// Errors bubble up unmodified; the only transformation is the top-level
/// entry point swallowing [`ExtractError::TableNotFound`] for system schemas.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The statement did not parse.
    #[error("failed to parse statement: {0}")]
    Parse(#[from] sqlparser::parser::ParserError),

    /// The input held more than one statement.
    #[error("expect one statement but found {0}")]
    MultipleStatements(usize),

    /// The single statement is not a query (and not EXPLAIN).
    #[error("expect a query statement")]
    NotAQuery,

    /// A referenced table exists in neither the CTE stack nor the catalog.
    #[error("table \"{schema}.{table}\" not found")]
    TableNotFound {
        /// Schema the reference resolved against (`public` when unqualified).
        schema: String,
        /// The referenced table name.
        table: String,
    },

    /// UNION/INTERSECT/EXCEPT arms produced different column counts.
    #[error("each UNION/INTERSECT/EXCEPT query must have the same number of columns, found {left} and {right}")]
    SetOpArityMismatch {
        /// Column count of the left arm.
        left: usize,
        /// Column count of the right arm.
        right: usize,
    },

    /// An alias or CTE column list does not match the source column count.
    #[error("expect equal length but found {aliases} and {columns}")]
    ColumnArityMismatch {
        /// Number of alias column names supplied.
        aliases: usize,
        /// Number of columns produced by the source.
        columns: usize,
    },

    /// An AST node had an unexpected concrete shape.
    #[error("malformed AST: {0}")]
    MalformedAst(String),

    /// A set operation this analyzer does not understand.
    #[error("unknown set operation {0}")]
    UnknownSetOperation(String),
}

impl ExtractError {
    /// Build a [`ExtractError::TableNotFound`], normalizing an empty schema
    /// reference to the `public` default it was matched against.
    pub fn table_not_found(schema: &str, table: &str) -> Self {
        let schema = if schema.is_empty() { "public" } else { schema };
        ExtractError::TableNotFound {
            schema: schema.to_string(),
            table: table.to_string(),
        }
    }
}
