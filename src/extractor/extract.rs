use std::collections::BTreeSet;

use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::catalog::{CatalogSnapshot, MaskingLevel};
use crate::extractor::error::ExtractError;
use crate::extractor::field::{
    ColumnResource, FieldInfo, QuerySpan, QuerySpanResult, SensitiveColumn,
};

/// Schemas reserved by the database engine. A [`ExtractError::TableNotFound`]
/// against one of these is swallowed instead of surfaced: such queries probe
/// engine internals and carry no user data.
pub const SYSTEM_SCHEMAS: [&str; 3] = ["information_schema", "pg_catalog", "rw_catalog"];

/// A masking level together with the base columns that produced it.
#[derive(Debug, Clone, Default)]
pub(crate) struct FieldMask {
    pub(crate) level: MaskingLevel,
    pub(crate) sources: BTreeSet<ColumnResource>,
}

impl FieldMask {
    /// Raise the level to at least `other.level` and take `other`'s sources.
    pub(crate) fn absorb(&mut self, other: FieldMask) {
        self.level = self.level.max(other.level);
        self.sources.extend(other.sources);
    }

    /// True once no further contribution can change the level.
    pub(crate) fn saturated(&self) -> bool {
        self.level == MaskingLevel::MAX
    }
}

/// The schema of a CTE visible on the stack, with per-column provenance.
#[derive(Debug, Clone)]
pub(crate) struct CteTable {
    pub(crate) name: String,
    pub(crate) columns: Vec<CteColumn>,
}

/// One column of a CTE schema.
#[derive(Debug, Clone)]
pub(crate) struct CteColumn {
    pub(crate) name: String,
    pub(crate) masking_level: MaskingLevel,
    pub(crate) sources: BTreeSet<ColumnResource>,
}

/// Walks one parsed statement and resolves every output column back to the
/// base-table columns contributing to it.
///
/// An extractor owns the state of a single extraction: the CTE stack, the
/// outer-scope stack used by correlated subqueries, and the FROM field list
/// of the SELECT currently being evaluated. The catalog snapshot is borrowed
/// and never modified. Every function that pushes onto a stack restores it
/// on all exit paths, so the externally observable state after a call equals
/// the state before it.
pub struct SensitiveFieldExtractor<'a> {
    pub(crate) catalog: &'a CatalogSnapshot,
    pub(crate) cte_stack: Vec<CteTable>,
    pub(crate) outer_scope: Vec<FieldInfo>,
    pub(crate) from_fields: Vec<FieldInfo>,
}

impl<'a> SensitiveFieldExtractor<'a> {
    /// Create an extractor over a catalog snapshot.
    pub fn new(catalog: &'a CatalogSnapshot) -> Self {
        SensitiveFieldExtractor {
            catalog,
            cte_stack: Vec::new(),
            outer_scope: Vec::new(),
            from_fields: Vec::new(),
        }
    }

    /// Analyze one SQL statement and return its result columns annotated
    /// with masking levels.
    ///
    /// Returns `Ok(None)` for statements that are not interesting: EXPLAIN,
    /// and queries whose missing table lives in a system schema. Everything
    /// else that is not a single SELECT-like query is an error.
    pub fn extract(&mut self, sql: &str) -> Result<Option<Vec<SensitiveColumn>>, ExtractError> {
        let fields = match self.run(sql)? {
            Some(fields) => fields,
            None => return Ok(None),
        };
        Ok(Some(
            fields
                .into_iter()
                .map(|field| SensitiveColumn {
                    name: field.name,
                    masking_level: field.masking_level,
                })
                .collect(),
        ))
    }

    /// Analyze one SQL statement and return its query span: each result
    /// column with the set of base columns feeding it.
    pub fn extract_span(&mut self, sql: &str) -> Result<Option<QuerySpan>, ExtractError> {
        let fields = match self.run(sql)? {
            Some(fields) => fields,
            None => return Ok(None),
        };
        Ok(Some(QuerySpan::new(
            fields
                .into_iter()
                .map(|field| QuerySpanResult {
                    name: field.name,
                    source_columns: field.sources,
                })
                .collect(),
        )))
    }

    fn run(&mut self, sql: &str) -> Result<Option<Vec<FieldInfo>>, ExtractError> {
        let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)?;
        if statements.len() != 1 {
            return Err(ExtractError::MultipleStatements(statements.len()));
        }

        let query = match &statements[0] {
            Statement::Query(query) => query,
            Statement::Explain { .. } => {
                tracing::debug!("skipping EXPLAIN statement");
                return Ok(None);
            }
            _ => return Err(ExtractError::NotAQuery),
        };

        match self.query_fields(query) {
            Ok(fields) => Ok(Some(fields)),
            Err(ExtractError::TableNotFound { schema, table })
                if SYSTEM_SCHEMAS.contains(&schema.as_str()) =>
            {
                tracing::debug!(schema, table, "system schema lookup miss, skipping");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Fresh extractor for a subquery appearing inside an expression.
    ///
    /// The subquery sees the caller's outer scope followed by the caller's
    /// FROM list, so correlated references resolve; it owns an empty FROM
    /// list and an empty CTE stack of its own.
    pub(crate) fn subquery_extractor(&self) -> SensitiveFieldExtractor<'a> {
        let mut outer_scope = self.outer_scope.clone();
        outer_scope.extend(self.from_fields.iter().cloned());
        SensitiveFieldExtractor {
            catalog: self.catalog,
            cte_stack: Vec::new(),
            outer_scope,
            from_fields: Vec::new(),
        }
    }

    /// Resolve a column reference to its masking level and sources.
    ///
    /// Search order: the outer-scope stack in reverse (nearest enclosing
    /// scope wins; an empty reference schema matches fields under `public`),
    /// then the current FROM list in order, where schema qualifiers are
    /// ignored. A reference that matches nothing contributes the default
    /// level; base semantics may legitimately bind it later, so a miss is
    /// soft.
    pub(crate) fn resolve_masking(&self, schema: &str, table: &str, column: &str) -> FieldMask {
        for field in self.outer_scope.iter().rev() {
            let schema_matches =
                (schema.is_empty() && field.schema == "public") || schema == field.schema;
            let table_matches = table.is_empty() || table == field.table;
            if schema_matches && table_matches && column == field.name {
                return FieldMask {
                    level: field.masking_level,
                    sources: field.sources.clone(),
                };
            }
        }

        for field in &self.from_fields {
            let table_matches = table.is_empty() || table == field.table;
            if table_matches && column == field.name {
                return FieldMask {
                    level: field.masking_level,
                    sources: field.sources.clone(),
                };
            }
        }

        FieldMask::default()
    }

    /// Fields of a named relation: the closest CTE with that name, else a
    /// catalog table.
    ///
    /// CTE names shadow catalog tables and are matched on the bare table
    /// name, so the nearest definition wins even across nesting levels. The
    /// returned fields carry the relation name as their table and an empty
    /// schema; aliasing is applied by the caller.
    pub(crate) fn relation_fields(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<Vec<FieldInfo>, ExtractError> {
        for cte in self.cte_stack.iter().rev() {
            if cte.name == table {
                return Ok(cte
                    .columns
                    .iter()
                    .map(|column| FieldInfo {
                        schema: String::new(),
                        table: cte.name.clone(),
                        name: column.name.clone(),
                        masking_level: column.masking_level,
                        sources: column.sources.clone(),
                    })
                    .collect());
            }
        }

        let resolved = self.catalog.find_table(schema, table)?;
        Ok(resolved
            .table
            .columns
            .iter()
            .map(|column| FieldInfo {
                schema: String::new(),
                table: resolved.table.name.clone(),
                name: column.name.clone(),
                masking_level: column.masking_level,
                sources: BTreeSet::from([ColumnResource {
                    database: resolved.database.to_string(),
                    schema: resolved.schema.to_string(),
                    table: resolved.table.name.clone(),
                    column: column.name.clone(),
                }]),
            })
            .collect())
    }
}
