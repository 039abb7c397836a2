use std::collections::{BTreeSet, HashMap, HashSet};

use sqlparser::ast::{
    JoinConstraint, JoinOperator, ObjectName, Query, TableAlias, TableFactor, TableWithJoins,
};

use crate::catalog::MaskingLevel;
use crate::extractor::error::ExtractError;
use crate::extractor::extract::SensitiveFieldExtractor;
use crate::extractor::field::{ColumnResource, FieldInfo};
use crate::extractor::names::{ident_value, object_name_idents, schema_and_table};

impl SensitiveFieldExtractor<'_> {
    /// Fields produced by one FROM entry and its chained joins.
    ///
    /// sqlparser linearizes the join tree into a relation plus a join list;
    /// folding the merger left to right reproduces the binary tree's
    /// left-to-right evaluation order, which `SELECT *` depends on.
    pub(crate) fn table_with_joins_fields(
        &mut self,
        table: &TableWithJoins,
    ) -> Result<Vec<FieldInfo>, ExtractError> {
        let mut fields = self.table_factor_fields(&table.relation)?;
        for join in &table.joins {
            let right = self.table_factor_fields(&join.relation)?;
            fields = merge_join_fields(fields, right, &join.join_operator)?;
        }
        Ok(fields)
    }

    /// Fields produced by a single FROM item.
    ///
    /// Table functions, UNNEST, and other exotic factors are not modeled and
    /// produce no fields.
    fn table_factor_fields(
        &mut self,
        factor: &TableFactor,
    ) -> Result<Vec<FieldInfo>, ExtractError> {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                self.base_relation_fields(name, alias.as_ref())
            }
            TableFactor::Derived {
                subquery, alias, ..
            } => self.derived_table_fields(subquery, alias.as_ref()),
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => self.table_with_joins_fields(table_with_joins),
            _ => Ok(Vec::new()),
        }
    }

    /// Fields of a base relation reference, CTEs included.
    fn base_relation_fields(
        &mut self,
        name: &ObjectName,
        alias: Option<&TableAlias>,
    ) -> Result<Vec<FieldInfo>, ExtractError> {
        let (schema, table) = schema_and_table(name)?;
        let fields = self.relation_fields(&schema, &table)?;
        match alias {
            None => Ok(fields),
            Some(alias) => apply_table_alias(fields, alias),
        }
    }

    /// Fields of a subquery in FROM, evaluated in the current scope so the
    /// enclosing WITH frame stays visible.
    fn derived_table_fields(
        &mut self,
        subquery: &Query,
        alias: Option<&TableAlias>,
    ) -> Result<Vec<FieldInfo>, ExtractError> {
        let fields = self.query_fields(subquery)?;
        match alias {
            None => Ok(fields),
            Some(alias) => apply_table_alias(fields, alias),
        }
    }
}

/// Re-home a field list under an alias.
///
/// Aliased relations become visible under the default schema with the alias
/// as their table. An alias column list renames positionally and must match
/// the source arity exactly when present.
fn apply_table_alias(
    fields: Vec<FieldInfo>,
    alias: &TableAlias,
) -> Result<Vec<FieldInfo>, ExtractError> {
    let alias_name = ident_value(&alias.name);
    let column_names: Vec<String> = alias
        .columns
        .iter()
        .map(|column| ident_value(&column.name))
        .collect();
    if !column_names.is_empty() && column_names.len() != fields.len() {
        return Err(ExtractError::ColumnArityMismatch {
            aliases: column_names.len(),
            columns: fields.len(),
        });
    }

    Ok(fields
        .into_iter()
        .enumerate()
        .map(|(index, field)| FieldInfo {
            schema: "public".to_string(),
            table: alias_name.clone(),
            name: column_names
                .get(index)
                .cloned()
                .unwrap_or(field.name),
            masking_level: field.masking_level,
            sources: field.sources,
        })
        .collect())
}

/// Combine the two sides of a join into one ordered field list.
///
/// Natural joins merge same-named columns, USING joins merge the listed
/// columns, everything else concatenates. Merged columns take the maximum
/// masking level of the two sides and the union of their sources. Output
/// order is left fields first, then the right fields that did not merge.
pub(crate) fn merge_join_fields(
    left: Vec<FieldInfo>,
    right: Vec<FieldInfo>,
    operator: &JoinOperator,
) -> Result<Vec<FieldInfo>, ExtractError> {
    let Some(constraint) = join_constraint(operator) else {
        return Ok(concat(left, right));
    };

    match constraint {
        JoinConstraint::Natural => {
            let left_names: HashSet<String> =
                left.iter().map(|field| field.name.clone()).collect();
            let right_by_name = index_by_name(&right);

            let mut result = Vec::with_capacity(left.len() + right.len());
            for mut field in left {
                if let Some((level, sources)) = right_by_name.get(field.name.as_str()) {
                    field.masking_level = field.masking_level.max(*level);
                    field.sources.extend(sources.iter().cloned());
                }
                result.push(field);
            }
            for field in right {
                if !left_names.contains(&field.name) {
                    result.push(field);
                }
            }
            Ok(result)
        }
        JoinConstraint::Using(columns) => {
            let mut using: HashSet<String> = HashSet::new();
            for name in columns {
                let idents = object_name_idents(name)?;
                let column = idents.last().cloned().ok_or_else(|| {
                    ExtractError::MalformedAst("expect a USING column name".to_string())
                })?;
                using.insert(column);
            }

            let left_names: HashSet<String> =
                left.iter().map(|field| field.name.clone()).collect();
            let right_by_name = index_by_name(&right);

            let mut result = Vec::with_capacity(left.len() + right.len());
            for mut field in left {
                if using.contains(&field.name) {
                    if let Some((level, sources)) = right_by_name.get(field.name.as_str()) {
                        field.masking_level = field.masking_level.max(*level);
                        field.sources.extend(sources.iter().cloned());
                    }
                }
                result.push(field);
            }
            for field in right {
                if using.contains(&field.name) && left_names.contains(&field.name) {
                    continue;
                }
                result.push(field);
            }
            Ok(result)
        }
        _ => Ok(concat(left, right)),
    }
}

fn concat(mut left: Vec<FieldInfo>, right: Vec<FieldInfo>) -> Vec<FieldInfo> {
    left.extend(right);
    left
}

/// Last-wins name index over a field list, mirroring how duplicate column
/// names behave in map-based merging.
fn index_by_name(fields: &[FieldInfo]) -> HashMap<&str, (MaskingLevel, &BTreeSet<ColumnResource>)> {
    let mut map = HashMap::new();
    for field in fields {
        map.insert(field.name.as_str(), (field.masking_level, &field.sources));
    }
    map
}

fn join_constraint(operator: &JoinOperator) -> Option<&JoinConstraint> {
    match operator {
        JoinOperator::Join(constraint)
        | JoinOperator::Inner(constraint)
        | JoinOperator::Left(constraint)
        | JoinOperator::LeftOuter(constraint)
        | JoinOperator::Right(constraint)
        | JoinOperator::RightOuter(constraint)
        | JoinOperator::FullOuter(constraint) => Some(constraint),
        // CROSS JOIN and the apply/semi/anti family carry no NATURAL or
        // USING constraint worth merging on.
        _ => None,
    }
}
