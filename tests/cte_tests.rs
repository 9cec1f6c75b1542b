//! CTE hoisting as seen through translated queries

use octofhir_fhirpath_sql::{CteConfig, MockDialect, Translator, TranslatorConfig};
use pretty_assertions::assert_eq;

fn translator_with(cte: CteConfig) -> Translator {
    Translator::new(MockDialect::new(), TranslatorConfig::default().with_cte(cte)).unwrap()
}

#[test]
fn select_hoists_nested_array_navigation() {
    let translation = translator_with(CteConfig::default())
        .translate("name.given", None)
        .unwrap();
    assert_eq!(translation.ctes.len(), 1);
    let body = &translation.ctes["cte_1"];
    assert!(body.starts_with("SELECT r.id AS row_key, (SELECT CASE"));
    assert!(body.ends_with("AS value FROM fhir_resources AS r"));
    assert_eq!(
        translation.sql,
        format!(
            "WITH cte_1 AS ({body}) SELECT r.id, \
             (SELECT cte_1.value FROM cte_1 WHERE cte_1.row_key = r.id) AS result \
             FROM fhir_resources AS r"
        )
    );
}

#[test]
fn single_level_navigation_is_never_hoisted() {
    let translation = translator_with(CteConfig::default())
        .translate("name", Some("Patient"))
        .unwrap();
    assert!(translation.ctes.is_empty());
    assert!(!translation.sql.starts_with("WITH"));
}

#[test]
fn where_contexts_stay_inline() {
    let translator = translator_with(CteConfig::default());
    for expr in ["name.given.exists()", "contact.name.given = 'Jo'"] {
        let translation = translator.translate_filter(expr, Some("Patient")).unwrap();
        assert!(translation.ctes.is_empty(), "{expr}");
        assert!(!translation.sql.contains("cte_"), "{expr}");
    }
}

#[test]
fn chained_hoists_register_dependencies_first() {
    let translation = translator_with(CteConfig::default())
        .translate("contact.name.given", Some("Patient"))
        .unwrap();
    let names: Vec<&str> = translation.ctes.keys().map(String::as_str).collect();
    assert_eq!(names, ["cte_1", "cte_2"]);
    assert!(translation.ctes["cte_2"].contains("FROM cte_1 WHERE cte_1.row_key = r.id"));
    assert!(
        translation
            .sql
            .contains("(SELECT cte_2.value FROM cte_2 WHERE cte_2.row_key = r.id) AS result")
    );
    let with = translation.sql.find("cte_1 AS (").unwrap();
    let dependent = translation.sql.find("cte_2 AS (").unwrap();
    assert!(with < dependent);
}

#[test]
fn registration_order_follows_generation_order() {
    let translation = translator_with(CteConfig::default())
        .translate("name.given | telecom.value", Some("Patient"))
        .unwrap();
    assert!(translation.ctes["cte_1"].contains("'given'"));
    assert!(translation.ctes["cte_2"].contains("'value'"));
}

#[test]
fn repeated_paths_share_one_cte() {
    let translation = translator_with(CteConfig::heuristic_only())
        .translate("name.given | name.given", Some("Patient"))
        .unwrap();
    assert_eq!(translation.ctes.len(), 1);
    assert_eq!(
        translation
            .sql
            .matches("(SELECT cte_1.value FROM cte_1 WHERE cte_1.row_key = r.id)")
            .count(),
        2
    );
}

#[test]
fn heuristics_leave_simple_fragments_inline() {
    let translation = translator_with(CteConfig::heuristic_only())
        .translate("name.given", Some("Patient"))
        .unwrap();
    assert!(translation.ctes.is_empty());
}

#[test]
fn length_threshold_triggers_hoist() {
    let cte = CteConfig {
        max_inline_length: 10,
        ..CteConfig::heuristic_only()
    };
    let translation = translator_with(cte)
        .translate("name.given", Some("Patient"))
        .unwrap();
    assert_eq!(translation.ctes.len(), 1);
}

#[test]
fn iteration_bodies_stay_inline() {
    let translation = translator_with(CteConfig::default())
        .translate("name.where(given.exists())", Some("Patient"))
        .unwrap();
    assert!(translation.ctes.is_empty());
}

#[test]
fn disabled_and_prefixed_configurations() {
    let inline = translator_with(CteConfig::disabled())
        .translate("contact.name.given", Some("Patient"))
        .unwrap();
    assert!(inline.ctes.is_empty());

    let prefixed = translator_with(CteConfig {
        name_prefix: "nav".to_string(),
        ..CteConfig::default()
    })
    .translate("name.given", Some("Patient"))
    .unwrap();
    assert!(prefixed.sql.starts_with("WITH nav_1 AS ("));
}

#[test]
fn fresh_registry_per_call() {
    let translator = translator_with(CteConfig::default());
    let first = translator.translate("contact.name.given", Some("Patient")).unwrap();
    let second = translator.translate("contact.name.given", Some("Patient")).unwrap();
    assert_eq!(first.sql, second.sql);
    assert_eq!(second.ctes.keys().next().map(String::as_str), Some("cte_1"));
}
