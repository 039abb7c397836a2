use sqlparser::ast::{
    DataType, Expr, FunctionArguments, Ident, ObjectName, ObjectNamePart, Query, SelectItem,
    SetExpr,
};

use crate::extractor::error::ExtractError;

/// Placeholder name `PostgreSQL` gives to expressions it cannot name.
pub const UNKNOWN_FIELD_NAME: &str = "?column?";

/// Keyword functions callable without parentheses, mapped by `PostgreSQL`
/// to a canonical lower-case result column name.
const SQL_VALUE_FUNCTIONS: &[&str] = &[
    "current_date",
    "current_time",
    "current_timestamp",
    "localtime",
    "localtimestamp",
    "current_role",
    "current_user",
    "user",
    "session_user",
    "current_catalog",
    "current_schema",
];

/// The effective value of an identifier.
///
/// `PostgreSQL` folds unquoted identifiers to lower case before name
/// resolution; `sqlparser` preserves the source spelling, so the fold
/// happens here. Quoted identifiers keep their exact spelling.
pub fn ident_value(ident: &Ident) -> String {
    if ident.quote_style.is_none() {
        ident.value.to_lowercase()
    } else {
        ident.value.clone()
    }
}

/// Flatten an object name into its identifier values.
///
/// Fails with [`ExtractError::MalformedAst`] when a part is not a plain
/// identifier.
pub fn object_name_idents(name: &ObjectName) -> Result<Vec<String>, ExtractError> {
    name.0
        .iter()
        .map(|part| match part {
            ObjectNamePart::Identifier(ident) => Ok(ident_value(ident)),
            other => Err(ExtractError::MalformedAst(format!(
                "expect an identifier but found {other}"
            ))),
        })
        .collect()
}

/// Split an object name into `(schema, table)`, taking the last two parts.
///
/// A leading database qualifier is ignored, matching how the analyzer
/// treats `db.schema.table` references.
pub fn schema_and_table(name: &ObjectName) -> Result<(String, String), ExtractError> {
    let mut idents = object_name_idents(name)?;
    let table = idents.pop().ok_or_else(|| {
        ExtractError::MalformedAst("expect a non-empty object name".to_string())
    })?;
    let schema = idents.pop().unwrap_or_default();
    Ok((schema, table))
}

/// Decompose a column reference into `(schema, table, column)`.
///
/// Returns `None` for expressions that are not column references. Missing
/// qualifiers come back as empty strings; a four-part reference drops the
/// database qualifier.
pub fn column_ref_parts(expr: &Expr) -> Option<(String, String, String)> {
    match expr {
        Expr::Identifier(ident) => Some((String::new(), String::new(), ident_value(ident))),
        Expr::CompoundIdentifier(parts) => {
            let mut values: Vec<String> = parts.iter().map(ident_value).collect();
            let column = values.pop()?;
            let table = values.pop().unwrap_or_default();
            let schema = values.pop().unwrap_or_default();
            Some((schema, table, column))
        }
        _ => None,
    }
}

/// Derive a stable result-column name for an unaliased target expression.
///
/// Reproduces the `PostgreSQL` naming heuristic: column references keep the
/// column part, function calls keep the function name, casts prefer the
/// argument's name and fall back to the type name, and a handful of
/// constructs have fixed names. Everything else is [`UNKNOWN_FIELD_NAME`].
pub fn derived_field_name(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(ident) => ident_value(ident),
        Expr::CompoundIdentifier(parts) => parts
            .last()
            .map(ident_value)
            .unwrap_or_else(|| UNKNOWN_FIELD_NAME.to_string()),
        Expr::Function(func) => {
            let name = func
                .name
                .0
                .last()
                .and_then(|part| match part {
                    ObjectNamePart::Identifier(ident) => Some(ident_value(ident)),
                    _ => None,
                })
                .unwrap_or_else(|| UNKNOWN_FIELD_NAME.to_string());
            // Parenthesis-free keyword functions canonicalize regardless of
            // the spelling in the source.
            if matches!(func.args, FunctionArguments::None)
                && SQL_VALUE_FUNCTIONS.contains(&name.as_str())
            {
                return name;
            }
            name
        }
        Expr::Cast {
            expr: inner,
            data_type,
            ..
        } => {
            let inner_name = derived_field_name(inner);
            if inner_name != UNKNOWN_FIELD_NAME {
                return inner_name;
            }
            type_cast_name(data_type)
        }
        Expr::Collate { expr: inner, .. } => derived_field_name(inner),
        Expr::Nested(inner) => derived_field_name(inner),
        Expr::Case { .. } => "case".to_string(),
        Expr::Array(_) => "array".to_string(),
        Expr::Tuple(_) => "row".to_string(),
        Expr::Exists { .. } => "exists".to_string(),
        Expr::Subquery(query) => scalar_subquery_name(query),
        _ => UNKNOWN_FIELD_NAME.to_string(),
    }
}

/// Name of a scalar subquery target: a single-column sub-select lends the
/// derived name of that column, anything else is unknown.
fn scalar_subquery_name(query: &Query) -> String {
    let SetExpr::Select(select) = query.body.as_ref() else {
        return UNKNOWN_FIELD_NAME.to_string();
    };
    if select.projection.len() != 1 {
        return UNKNOWN_FIELD_NAME.to_string();
    }
    match &select.projection[0] {
        SelectItem::UnnamedExpr(inner) => derived_field_name(inner),
        SelectItem::ExprWithAlias { alias, .. } => ident_value(alias),
        SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..) => {
            UNKNOWN_FIELD_NAME.to_string()
        }
    }
}

/// Result name of a cast whose argument has no name of its own.
fn type_cast_name(data_type: &DataType) -> String {
    if let DataType::Custom(name, _) = data_type {
        if let Some(ObjectNamePart::Identifier(ident)) = name.0.last() {
            return ident_value(ident);
        }
    }
    let rendered = data_type.to_string().to_lowercase();
    // Strip length/precision arguments: `varchar(10)` names the column
    // `varchar`.
    match rendered.split_once('(') {
        Some((base, _)) => base.trim().to_string(),
        None => rendered,
    }
}
