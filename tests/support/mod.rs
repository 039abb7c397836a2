#![allow(dead_code)]

use maskspan::catalog::{
    CatalogSnapshot, ColumnInfo, DatabaseInfo, MaskingLevel, SchemaInfo, TableSchema,
};
use maskspan::extractor::{ExtractError, SensitiveColumn, SensitiveFieldExtractor};

/// Catalog with one database `db1` holding `public.t(a NONE, b FULL)` and
/// `public.s(x PARTIAL, y NONE)`.
pub fn demo_catalog() -> CatalogSnapshot {
    demo_catalog_with_levels(MaskingLevel::None, MaskingLevel::Full)
}

/// The demo catalog with configurable levels for `t.a` and `t.b`.
pub fn demo_catalog_with_levels(
    level_a: MaskingLevel,
    level_b: MaskingLevel,
) -> CatalogSnapshot {
    CatalogSnapshot {
        databases: vec![DatabaseInfo {
            name: "db1".to_string(),
            schemas: vec![SchemaInfo {
                name: "public".to_string(),
                tables: vec![
                    TableSchema {
                        name: "t".to_string(),
                        columns: vec![
                            ColumnInfo {
                                name: "a".to_string(),
                                masking_level: level_a,
                            },
                            ColumnInfo {
                                name: "b".to_string(),
                                masking_level: level_b,
                            },
                        ],
                    },
                    TableSchema {
                        name: "s".to_string(),
                        columns: vec![
                            ColumnInfo {
                                name: "x".to_string(),
                                masking_level: MaskingLevel::Partial,
                            },
                            ColumnInfo {
                                name: "y".to_string(),
                                masking_level: MaskingLevel::None,
                            },
                        ],
                    },
                ],
            }],
        }],
    }
}

/// Extract against the demo catalog, expecting an interesting query.
pub fn extract(sql: &str) -> Vec<SensitiveColumn> {
    extract_from(&demo_catalog(), sql)
}

/// Extract against a specific catalog, expecting an interesting query.
pub fn extract_from(catalog: &CatalogSnapshot, sql: &str) -> Vec<SensitiveColumn> {
    SensitiveFieldExtractor::new(catalog)
        .extract(sql)
        .expect("extraction should succeed")
        .expect("statement should be a query")
}

/// Extract against the demo catalog, expecting failure.
pub fn extract_err(sql: &str) -> ExtractError {
    let catalog = demo_catalog();
    SensitiveFieldExtractor::new(&catalog)
        .extract(sql)
        .expect_err("extraction should fail")
}

/// Render results as `(name, level)` pairs for compact assertions.
pub fn named_levels(columns: &[SensitiveColumn]) -> Vec<(String, MaskingLevel)> {
    columns
        .iter()
        .map(|column| (column.name.clone(), column.masking_level))
        .collect()
}
