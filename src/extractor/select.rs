use sqlparser::ast::{
    Cte, Query, Select, SelectItem, SelectItemQualifiedWildcardKind, SetExpr, SetOperator, Table,
    Values,
};

use crate::catalog::MaskingLevel;
use crate::extractor::error::ExtractError;
use crate::extractor::extract::{CteColumn, CteTable, SensitiveFieldExtractor};
use crate::extractor::field::FieldInfo;
use crate::extractor::names::{derived_field_name, ident_value, schema_and_table};

impl SensitiveFieldExtractor<'_> {
    /// Evaluate a query, scoping any WITH frame it introduces.
    ///
    /// The CTE stack is truncated back to its entry depth on every exit
    /// path, success or error, so no frame outlives the query that pushed
    /// it.
    pub(crate) fn query_fields(&mut self, query: &Query) -> Result<Vec<FieldInfo>, ExtractError> {
        let depth = self.cte_stack.len();
        let result = self.query_fields_inner(query);
        self.cte_stack.truncate(depth);
        result
    }

    fn query_fields_inner(&mut self, query: &Query) -> Result<Vec<FieldInfo>, ExtractError> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                let table = if with.recursive {
                    self.recursive_cte_table(cte)?
                } else {
                    self.cte_table(cte)?
                };
                self.cte_stack.push(table);
            }
        }
        self.set_expr_fields(&query.body)
    }

    /// Evaluate a query body: SELECT, VALUES, set operation, or the
    /// `TABLE t` shorthand.
    fn set_expr_fields(&mut self, body: &SetExpr) -> Result<Vec<FieldInfo>, ExtractError> {
        match body {
            SetExpr::Select(select) => self.select_fields(select),
            SetExpr::Query(query) => self.query_fields(query),
            SetExpr::Values(values) => self.values_fields(values),
            SetExpr::SetOperation {
                op, left, right, ..
            } => match op {
                SetOperator::Union | SetOperator::Intersect | SetOperator::Except => {
                    self.set_operation_fields(left, right)
                }
                other => Err(ExtractError::UnknownSetOperation(other.to_string())),
            },
            SetExpr::Table(table) => self.table_body_fields(table),
            other => Err(ExtractError::MalformedAst(format!(
                "expect a query body but found {other}"
            ))),
        }
    }

    /// UNION/INTERSECT/EXCEPT: both arms must agree on arity; the output
    /// keeps the left arm's names and tables and takes the per-column level
    /// maximum of the two sides.
    fn set_operation_fields(
        &mut self,
        left: &SetExpr,
        right: &SetExpr,
    ) -> Result<Vec<FieldInfo>, ExtractError> {
        let left_fields = self.set_expr_fields(left)?;
        let right_fields = self.set_expr_fields(right)?;
        if left_fields.len() != right_fields.len() {
            return Err(ExtractError::SetOpArityMismatch {
                left: left_fields.len(),
                right: right_fields.len(),
            });
        }

        Ok(left_fields
            .into_iter()
            .zip(right_fields)
            .map(|(left_field, right_field)| {
                let mut sources = left_field.sources;
                sources.extend(right_field.sources);
                FieldInfo {
                    schema: String::new(),
                    table: left_field.table,
                    name: left_field.name,
                    masking_level: MaskingLevel::default()
                        .max(left_field.masking_level)
                        .max(right_field.masking_level),
                    sources,
                }
            })
            .collect())
    }

    /// VALUES lists name their columns `column1 … columnN`.
    ///
    /// Every row is walked so errors surface, but the first row alone seeds
    /// the result names and levels.
    fn values_fields(&mut self, values: &Values) -> Result<Vec<FieldInfo>, ExtractError> {
        let mut result: Vec<FieldInfo> = Vec::new();
        for row in &values.rows {
            let mut row_masks = Vec::with_capacity(row.len());
            for expr in row {
                row_masks.push(self.expression_mask(expr)?);
            }
            if result.is_empty() {
                result = row_masks
                    .into_iter()
                    .enumerate()
                    .map(|(index, mask)| {
                        FieldInfo::computed(format!("column{}", index + 1), mask.level, mask.sources)
                    })
                    .collect();
            }
        }
        Ok(result)
    }

    /// `TABLE t` is shorthand for selecting every column of `t`.
    fn table_body_fields(&mut self, table: &Table) -> Result<Vec<FieldInfo>, ExtractError> {
        let schema = table.schema_name.as_deref().unwrap_or_default();
        let name = table.table_name.as_deref().unwrap_or_default();
        self.relation_fields(schema, name)
    }

    /// A plain SELECT: build the FROM field list, then evaluate targets.
    ///
    /// The FROM list is swapped in for the duration of target evaluation and
    /// the previous list restored on exit, keeping nested SELECTs from
    /// clobbering their enclosing scope.
    fn select_fields(&mut self, select: &Select) -> Result<Vec<FieldInfo>, ExtractError> {
        let mut from_fields = Vec::new();
        for item in &select.from {
            let fields = self.table_with_joins_fields(item)?;
            from_fields.extend(fields);
        }

        let saved = std::mem::replace(&mut self.from_fields, from_fields);
        let result = self.target_fields(select);
        self.from_fields = saved;
        result
    }

    fn target_fields(&mut self, select: &Select) -> Result<Vec<FieldInfo>, ExtractError> {
        let mut result = Vec::new();
        for item in &select.projection {
            match item {
                SelectItem::Wildcard(_) => {
                    result.extend(self.from_fields.iter().cloned());
                }
                SelectItem::QualifiedWildcard(kind, _) => {
                    let SelectItemQualifiedWildcardKind::ObjectName(name) = kind else {
                        return Err(ExtractError::MalformedAst(
                            "expect a table-qualified wildcard".to_string(),
                        ));
                    };
                    let (schema, table) = schema_and_table(name)?;
                    for field in &self.from_fields {
                        let schema_matches = schema.is_empty() || schema == field.schema;
                        if schema_matches && table == field.table {
                            result.push(field.clone());
                        }
                    }
                }
                SelectItem::UnnamedExpr(expr) => {
                    let mask = self.expression_mask(expr)?;
                    result.push(FieldInfo::computed(
                        derived_field_name(expr),
                        mask.level,
                        mask.sources,
                    ));
                }
                SelectItem::ExprWithAlias { expr, alias } => {
                    let mask = self.expression_mask(expr)?;
                    result.push(FieldInfo::computed(
                        ident_value(alias),
                        mask.level,
                        mask.sources,
                    ));
                }
            }
        }
        Ok(result)
    }

    /// Schema of a non-recursive CTE: its body's fields under the CTE name,
    /// renamed by the explicit column list when one is given.
    fn cte_table(&mut self, cte: &Cte) -> Result<CteTable, ExtractError> {
        let fields = self.query_fields(&cte.query)?;
        let fields = apply_cte_column_names(fields, cte)?;
        Ok(build_cte_table(ident_value(&cte.alias.name), fields))
    }

    /// Schema of a recursive CTE via monotone fixpoint iteration.
    ///
    /// A recursive CTE body is a UNION whose left arm is the initial query
    /// and whose right arm references the CTE itself. The initial arm seeds
    /// the schema; the recursive arm is re-evaluated against the current
    /// schema until a full pass raises no level. Levels only ever rise, so
    /// the iteration count is bounded by the column count times the number
    /// of levels above the minimum. Bodies that are not a UNION evaluate
    /// non-recursively.
    fn recursive_cte_table(&mut self, cte: &Cte) -> Result<CteTable, ExtractError> {
        let SetExpr::SetOperation {
            op: SetOperator::Union,
            left,
            right,
            ..
        } = cte.query.body.as_ref()
        else {
            return self.cte_table(cte);
        };

        let initial = self.set_expr_fields(left)?;
        let initial = apply_cte_column_names(initial, cte)?;
        let seed = build_cte_table(ident_value(&cte.alias.name), initial);

        self.cte_stack.push(seed);
        let result = self.recursive_cte_fixpoint(right);
        let table = self
            .cte_stack
            .pop()
            .expect("the fixpoint frame is still on the stack");
        result.map(|()| table)
    }

    fn recursive_cte_fixpoint(&mut self, recursive_arm: &SetExpr) -> Result<(), ExtractError> {
        loop {
            let fields = self.set_expr_fields(recursive_arm)?;
            let top = self
                .cte_stack
                .last_mut()
                .expect("the fixpoint frame is on the stack");
            if fields.len() != top.columns.len() {
                return Err(ExtractError::ColumnArityMismatch {
                    aliases: top.columns.len(),
                    columns: fields.len(),
                });
            }

            let mut changed = false;
            for (column, field) in top.columns.iter_mut().zip(fields) {
                if column.masking_level < field.masking_level {
                    column.masking_level = field.masking_level;
                    changed = true;
                }
                column.sources.extend(field.sources);
            }
            if !changed {
                return Ok(());
            }
            tracing::trace!(cte = %top.name, "levels raised, iterating recursive CTE again");
        }
    }
}

fn apply_cte_column_names(
    mut fields: Vec<FieldInfo>,
    cte: &Cte,
) -> Result<Vec<FieldInfo>, ExtractError> {
    let names: Vec<String> = cte
        .alias
        .columns
        .iter()
        .map(|column| ident_value(&column.name))
        .collect();
    if names.is_empty() {
        return Ok(fields);
    }
    if names.len() != fields.len() {
        return Err(ExtractError::ColumnArityMismatch {
            aliases: names.len(),
            columns: fields.len(),
        });
    }
    for (field, name) in fields.iter_mut().zip(names) {
        field.name = name;
    }
    Ok(fields)
}

fn build_cte_table(name: String, fields: Vec<FieldInfo>) -> CteTable {
    CteTable {
        name,
        columns: fields
            .into_iter()
            .map(|field| CteColumn {
                name: field.name,
                masking_level: field.masking_level,
                sources: field.sources,
            })
            .collect(),
    }
}
