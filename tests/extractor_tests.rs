use maskspan::catalog::MaskingLevel;
use maskspan::extractor::{ExtractError, SensitiveFieldExtractor};

mod support;

use support::{demo_catalog, demo_catalog_with_levels, extract, extract_err, named_levels};

#[test]
fn plain_column_selection_keeps_catalog_levels() {
    let result = named_levels(&extract("SELECT a, b FROM t"));
    assert_eq!(
        result,
        vec![
            ("a".to_string(), MaskingLevel::None),
            ("b".to_string(), MaskingLevel::Full),
        ]
    );
}

#[test]
fn alias_renames_the_result_column() {
    let result = named_levels(&extract("SELECT a AS k FROM t"));
    assert_eq!(result, vec![("k".to_string(), MaskingLevel::None)]);
}

#[test]
fn expressions_take_the_maximum_over_contributors() {
    let result = named_levels(&extract("SELECT a + b AS c FROM t"));
    assert_eq!(result, vec![("c".to_string(), MaskingLevel::Full)]);
}

#[test]
fn natural_join_without_common_columns_behaves_like_cross() {
    let result = named_levels(&extract("SELECT t.a, s.x FROM t NATURAL JOIN s"));
    assert_eq!(
        result,
        vec![
            ("a".to_string(), MaskingLevel::None),
            ("x".to_string(), MaskingLevel::Partial),
        ]
    );
}

#[test]
fn cte_results_carry_the_body_levels() {
    let result = named_levels(&extract("WITH r(c1) AS (SELECT b FROM t) SELECT c1 FROM r"));
    assert_eq!(result, vec![("c1".to_string(), MaskingLevel::Full)]);
}

#[test]
fn uncorrelated_scalar_subquery_contributes_its_result() {
    let result = named_levels(&extract("SELECT (SELECT b FROM t) AS v FROM s"));
    assert_eq!(result, vec![("v".to_string(), MaskingLevel::Full)]);
}

#[test]
fn correlated_subquery_resolves_against_the_outer_query() {
    let result = named_levels(&extract(
        "SELECT (SELECT max(s.y) FROM s WHERE s.x = t.b) AS probe FROM t",
    ));
    // Only the subquery's target list contributes; its WHERE does not.
    assert_eq!(result, vec![("probe".to_string(), MaskingLevel::None)]);

    let result = named_levels(&extract(
        "SELECT (SELECT t.b FROM s LIMIT 1) AS leaked FROM t",
    ));
    assert_eq!(result, vec![("leaked".to_string(), MaskingLevel::Full)]);
}

#[test]
fn system_schema_misses_are_swallowed() {
    let catalog = demo_catalog();
    for sql in [
        "SELECT a FROM pg_catalog.foo",
        "SELECT a FROM information_schema.foo",
        "SELECT a FROM rw_catalog.foo",
    ] {
        let result = SensitiveFieldExtractor::new(&catalog)
            .extract(sql)
            .expect("system schema misses should not fail");
        assert!(result.is_none(), "`{sql}` should be skipped");
    }
}

#[test]
fn ordinary_missing_tables_still_fail() {
    let err = extract_err("SELECT a FROM missing");
    assert!(matches!(
        err,
        ExtractError::TableNotFound { ref schema, ref table }
            if schema == "public" && table == "missing"
    ));
}

#[test]
fn union_takes_left_names_and_max_levels() {
    let result = named_levels(&extract("SELECT a FROM t UNION SELECT x FROM s"));
    assert_eq!(result, vec![("a".to_string(), MaskingLevel::Partial)]);
}

#[test]
fn values_lists_use_positional_names() {
    let result = named_levels(&extract("VALUES (1, 'x'), (2, 'y')"));
    assert_eq!(
        result,
        vec![
            ("column1".to_string(), MaskingLevel::None),
            ("column2".to_string(), MaskingLevel::None),
        ]
    );
}

#[test]
fn recursive_cte_raises_levels_to_the_fixpoint() {
    // The recursive arm reads from `r` itself and feeds `b` (FULL) back in.
    let result = named_levels(&extract(
        "WITH RECURSIVE r(v) AS (SELECT a FROM t UNION SELECT b FROM r JOIN t ON true) SELECT v FROM r",
    ));
    assert_eq!(result, vec![("v".to_string(), MaskingLevel::Full)]);
}

// Boundary behaviors.

#[test]
fn constant_only_target_list_without_from() {
    let result = named_levels(&extract("SELECT 1 AS one, 'x', 2 + 2"));
    assert_eq!(
        result,
        vec![
            ("one".to_string(), MaskingLevel::None),
            ("?column?".to_string(), MaskingLevel::None),
            ("?column?".to_string(), MaskingLevel::None),
        ]
    );
}

#[test]
fn select_star_uses_table_column_order() {
    let result = named_levels(&extract("SELECT * FROM t"));
    assert_eq!(
        result,
        vec![
            ("a".to_string(), MaskingLevel::None),
            ("b".to_string(), MaskingLevel::Full),
        ]
    );
}

#[test]
fn explain_statements_are_skipped() {
    let catalog = demo_catalog();
    let result = SensitiveFieldExtractor::new(&catalog)
        .extract("EXPLAIN SELECT a FROM t")
        .expect("EXPLAIN should not fail");
    assert!(result.is_none());
}

#[test]
fn multiple_statements_are_rejected() {
    let err = extract_err("SELECT a FROM t; SELECT b FROM t");
    assert!(matches!(err, ExtractError::MultipleStatements(2)));
}

#[test]
fn non_query_statements_are_rejected() {
    let err = extract_err("INSERT INTO t (a) VALUES (1)");
    assert!(matches!(err, ExtractError::NotAQuery));
}

// Universal properties.

#[test]
fn result_arity_matches_the_expanded_target_list() {
    let cases = [
        ("SELECT a FROM t", 1),
        ("SELECT a, b, a + b FROM t", 3),
        ("SELECT * FROM t", 2),
        ("SELECT *, a FROM t", 3),
        ("SELECT t.*, s.* FROM t, s", 4),
    ];
    for (sql, arity) in cases {
        assert_eq!(extract(sql).len(), arity, "`{sql}`");
    }
}

#[test]
fn raising_a_source_level_never_lowers_an_output() {
    let queries = [
        "SELECT a, b FROM t",
        "SELECT a + b AS c FROM t",
        "SELECT a FROM t UNION SELECT x FROM s",
        "WITH r AS (SELECT a FROM t) SELECT * FROM r",
    ];
    let low = demo_catalog_with_levels(MaskingLevel::None, MaskingLevel::Full);
    let high = demo_catalog_with_levels(MaskingLevel::Partial, MaskingLevel::Full);

    for sql in queries {
        let before = support::extract_from(&low, sql);
        let after = support::extract_from(&high, sql);
        assert_eq!(before.len(), after.len(), "`{sql}`");
        for (b, a) in before.iter().zip(after.iter()) {
            assert!(
                b.masking_level <= a.masking_level,
                "`{sql}`: {} went from {} to {}",
                b.name,
                b.masking_level,
                a.masking_level
            );
        }
    }
}

#[test]
fn name_derivation_is_deterministic() {
    let sql = "SELECT a, max(b) AS peak, coalesce(a, 0), CASE WHEN a = 1 THEN b END FROM t";
    let first: Vec<String> = extract(sql).into_iter().map(|c| c.name).collect();
    let second: Vec<String> = extract(sql).into_iter().map(|c| c.name).collect();
    assert_eq!(first, second);
    assert_eq!(first, vec!["a", "peak", "coalesce", "case"]);
}

#[test]
fn swapping_join_sides_preserves_the_result_multiset() {
    let forward = named_levels(&extract(
        "SELECT * FROM t JOIN s ON t.a = s.y",
    ));
    let swapped = named_levels(&extract(
        "SELECT * FROM s JOIN t ON t.a = s.y",
    ));
    let mut forward_sorted = forward.clone();
    let mut swapped_sorted = swapped.clone();
    forward_sorted.sort();
    swapped_sorted.sort();
    assert_eq!(forward_sorted, swapped_sorted);
    assert_ne!(forward, swapped, "the permutation itself is observable");
}

#[test]
fn extractor_state_is_clean_after_each_call() {
    let catalog = demo_catalog();
    let mut extractor = SensitiveFieldExtractor::new(&catalog);

    extractor
        .extract("WITH r AS (SELECT a FROM t) SELECT (SELECT b FROM t) FROM r")
        .expect("extraction should succeed");
    extractor
        .extract("WITH r AS (SELECT a FROM missing) SELECT * FROM r")
        .expect_err("missing table should fail");

    // A follow-up query referencing `r` must not see a leaked CTE frame.
    let err = extractor
        .extract("SELECT * FROM r")
        .expect_err("r should be unknown after the failed call");
    assert!(matches!(err, ExtractError::TableNotFound { .. }));
}

// Query spans.

#[test]
fn spans_report_source_columns_per_result() {
    let catalog = demo_catalog();
    let span = SensitiveFieldExtractor::new(&catalog)
        .extract_span("SELECT a + b AS c, a AS k FROM t")
        .expect("extraction should succeed")
        .expect("statement should be a query");

    assert_eq!(span.results.len(), 2);
    assert_eq!(span.results[0].name, "c");
    let c_columns: Vec<String> = span.results[0]
        .source_columns
        .iter()
        .map(|source| format!("{}.{}.{}.{}", source.database, source.schema, source.table, source.column))
        .collect();
    assert_eq!(c_columns, vec!["db1.public.t.a", "db1.public.t.b"]);

    assert_eq!(span.results[1].name, "k");
    assert_eq!(span.results[1].source_columns.len(), 1);

    assert_eq!(span.source_columns.len(), 2, "span unions result sources");
}

#[test]
fn spans_follow_columns_through_ctes_and_joins() {
    let catalog = demo_catalog();
    let span = SensitiveFieldExtractor::new(&catalog)
        .extract_span("WITH r AS (SELECT a FROM t) SELECT * FROM r JOIN s ON true")
        .expect("extraction should succeed")
        .expect("statement should be a query");

    assert_eq!(span.results.len(), 3);
    let a_sources = &span.results[0].source_columns;
    assert_eq!(a_sources.len(), 1);
    assert_eq!(a_sources.iter().next().unwrap().table, "t");
}
