use sqlparser::ast::{
    Expr, Function, FunctionArg, FunctionArgExpr, FunctionArgumentClause, FunctionArguments,
    Query,
};

use crate::extractor::error::ExtractError;
use crate::extractor::extract::{FieldMask, SensitiveFieldExtractor};
use crate::extractor::names::column_ref_parts;

impl SensitiveFieldExtractor<'_> {
    /// Masking level (and contributing base columns) of a scalar expression.
    ///
    /// Folds `max` over every column reference reachable from the node,
    /// stopping early once the running level reaches the maximum. Constants,
    /// parameters, and node kinds this analyzer does not model contribute
    /// the default level.
    pub(crate) fn expression_mask(&self, expr: &Expr) -> Result<FieldMask, ExtractError> {
        match expr {
            Expr::Identifier(_) | Expr::CompoundIdentifier(_) => {
                let (schema, table, column) =
                    column_ref_parts(expr).expect("identifier expressions decompose");
                Ok(self.resolve_masking(&schema, &table, &column))
            }

            Expr::Nested(inner)
            | Expr::Cast { expr: inner, .. }
            | Expr::Collate { expr: inner, .. }
            | Expr::UnaryOp { expr: inner, .. }
            | Expr::IsNull(inner)
            | Expr::IsNotNull(inner)
            | Expr::IsTrue(inner)
            | Expr::IsNotTrue(inner)
            | Expr::IsFalse(inner)
            | Expr::IsNotFalse(inner)
            | Expr::IsUnknown(inner)
            | Expr::IsNotUnknown(inner)
            | Expr::Ceil { expr: inner, .. }
            | Expr::Floor { expr: inner, .. }
            | Expr::Convert { expr: inner, .. }
            | Expr::Extract { expr: inner, .. }
            | Expr::CompoundFieldAccess { root: inner, .. } => self.expression_mask(inner),

            Expr::BinaryOp { left, right, .. } => self.fold_masks([left.as_ref(), right.as_ref()]),
            Expr::IsDistinctFrom(left, right) | Expr::IsNotDistinctFrom(left, right) => {
                self.fold_masks([left.as_ref(), right.as_ref()])
            }
            Expr::Like { expr, pattern, .. }
            | Expr::ILike { expr, pattern, .. }
            | Expr::SimilarTo { expr, pattern, .. }
            | Expr::RLike { expr, pattern, .. } => {
                self.fold_masks([expr.as_ref(), pattern.as_ref()])
            }
            Expr::AtTimeZone {
                timestamp,
                time_zone,
            } => self.fold_masks([timestamp.as_ref(), time_zone.as_ref()]),
            Expr::Position { expr, r#in } => self.fold_masks([expr.as_ref(), r#in.as_ref()]),
            Expr::Between {
                expr, low, high, ..
            } => self.fold_masks([expr.as_ref(), low.as_ref(), high.as_ref()]),

            Expr::InList { expr, list, .. } => {
                let mut nodes: Vec<&Expr> = vec![expr.as_ref()];
                nodes.extend(list.iter());
                self.fold_masks(nodes)
            }
            Expr::InUnnest {
                expr, array_expr, ..
            } => self.fold_masks([expr.as_ref(), array_expr.as_ref()]),
            Expr::AnyOp { left, right, .. } | Expr::AllOp { left, right, .. } => {
                self.fold_masks([left.as_ref(), right.as_ref()])
            }

            Expr::Substring {
                expr,
                substring_from,
                substring_for,
                ..
            } => {
                let mut nodes: Vec<&Expr> = vec![expr.as_ref()];
                nodes.extend(substring_from.iter().map(AsRef::as_ref));
                nodes.extend(substring_for.iter().map(AsRef::as_ref));
                self.fold_masks(nodes)
            }
            Expr::Trim {
                expr,
                trim_what,
                trim_characters,
                ..
            } => {
                let mut nodes: Vec<&Expr> = vec![expr.as_ref()];
                nodes.extend(trim_what.iter().map(AsRef::as_ref));
                if let Some(characters) = trim_characters {
                    nodes.extend(characters.iter());
                }
                self.fold_masks(nodes)
            }
            Expr::Overlay {
                expr,
                overlay_what,
                overlay_from,
                overlay_for,
            } => {
                let mut nodes: Vec<&Expr> =
                    vec![expr.as_ref(), overlay_what.as_ref(), overlay_from.as_ref()];
                nodes.extend(overlay_for.iter().map(AsRef::as_ref));
                self.fold_masks(nodes)
            }

            Expr::Case {
                operand,
                conditions,
                else_result,
                ..
            } => {
                let mut nodes: Vec<&Expr> = Vec::new();
                nodes.extend(operand.iter().map(AsRef::as_ref));
                for when in conditions {
                    nodes.push(&when.condition);
                    nodes.push(&when.result);
                }
                nodes.extend(else_result.iter().map(AsRef::as_ref));
                self.fold_masks(nodes)
            }

            Expr::Array(array) => self.fold_masks(array.elem.iter()),
            Expr::Tuple(exprs) => self.fold_masks(exprs.iter()),
            Expr::GroupingSets(sets) | Expr::Cube(sets) | Expr::Rollup(sets) => {
                self.fold_masks(sets.iter().flatten())
            }
            Expr::Interval(interval) => self.expression_mask(&interval.value),

            Expr::Function(func) => self.function_mask(func),

            Expr::Subquery(query) => self.sublink_mask(None, query),
            Expr::Exists { subquery, .. } => self.sublink_mask(None, subquery),
            Expr::InSubquery { expr, subquery, .. } => {
                self.sublink_mask(Some(expr.as_ref()), subquery)
            }

            // Constants, parameters, wildcards, and anything this analyzer
            // does not model contribute the default level.
            _ => Ok(FieldMask::default()),
        }
    }

    /// Fold a function call: positional and named arguments, aggregate
    /// ORDER BY / LIMIT clauses, FILTER, and WITHIN GROUP all contribute.
    fn function_mask(&self, func: &Function) -> Result<FieldMask, ExtractError> {
        let mut nodes: Vec<&Expr> = Vec::new();
        match &func.args {
            FunctionArguments::None => {}
            FunctionArguments::Subquery(query) => return self.sublink_mask(None, query),
            FunctionArguments::List(list) => {
                for arg in &list.args {
                    match arg {
                        FunctionArg::Unnamed(FunctionArgExpr::Expr(expr))
                        | FunctionArg::Named {
                            arg: FunctionArgExpr::Expr(expr),
                            ..
                        } => nodes.push(expr),
                        _ => {}
                    }
                }
                for clause in &list.clauses {
                    match clause {
                        FunctionArgumentClause::OrderBy(order) => {
                            nodes.extend(order.iter().map(|item| &item.expr));
                        }
                        FunctionArgumentClause::Limit(expr) => nodes.push(expr),
                        _ => {}
                    }
                }
            }
        }
        nodes.extend(func.filter.iter().map(AsRef::as_ref));
        nodes.extend(func.within_group.iter().map(|item| &item.expr));
        self.fold_masks(nodes)
    }

    /// Evaluate a subquery appearing inside an expression.
    ///
    /// The test expression (the left side of `IN`, when present) resolves in
    /// the current scope. The subquery itself runs in a fresh extractor
    /// whose outer scope is this extractor's outer scope followed by its
    /// FROM list, so correlated references reach the enclosing query without
    /// touching this extractor's state.
    fn sublink_mask(&self, test: Option<&Expr>, query: &Query) -> Result<FieldMask, ExtractError> {
        let mut mask = match test {
            Some(expr) => self.expression_mask(expr)?,
            None => FieldMask::default(),
        };
        let mut subquery = self.subquery_extractor();
        for field in subquery.query_fields(query)? {
            mask.level = mask.level.max(field.masking_level);
            mask.sources.extend(field.sources);
            if mask.saturated() {
                return Ok(mask);
            }
        }
        Ok(mask)
    }

    /// Fold `max` over a list of expressions, stopping at the maximum level.
    fn fold_masks<'e, I>(&self, exprs: I) -> Result<FieldMask, ExtractError>
    where
        I: IntoIterator<Item = &'e Expr>,
    {
        let mut mask = FieldMask::default();
        for expr in exprs {
            mask.absorb(self.expression_mask(expr)?);
            if mask.saturated() {
                return Ok(mask);
            }
        }
        Ok(mask)
    }
}
