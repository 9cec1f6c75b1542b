//! End-to-end translation through the public API

use octofhir_fhirpath_sql::{
    ChoiceType, MockDialect, Shape, Translator, TranslatorConfig, ValueKind, translate,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::Arc;
use std::thread;

fn translator() -> Translator {
    Translator::new(MockDialect::new(), TranslatorConfig::default()).unwrap()
}

fn expression_sql(expr: &str, resource_type: Option<&str>) -> String {
    translator()
        .translate_expression(expr, resource_type)
        .unwrap()
        .sql
}

#[test]
fn numeric_addition_is_not_concatenation() {
    let sql = expression_sql("1 + 2", None);
    assert_eq!(sql, "(1 + 2)");
    assert!(!sql.contains("||"));
}

#[test]
fn string_operand_selects_concatenation() {
    let sql = expression_sql("'Hello' + name.family", Some("Patient"));
    assert!(sql.starts_with("('Hello' || "));
    assert!(sql.contains("'family'"));
}

#[rstest]
#[case("name.count() + 1")]
#[case("gender.length() + 1")]
#[case("telecom.where(system = 'phone').count() + 1")]
fn numeric_functions_use_addition(#[case] expr: &str) {
    let translation = translator()
        .translate_expression(expr, Some("Patient"))
        .unwrap();
    assert_eq!(translation.kind, ValueKind::Numeric, "{expr}");
    assert!(!translation.sql.contains("||"), "{expr}");
}

#[test]
fn division_by_zero_yields_null() {
    assert_eq!(expression_sql("5 / 0", None), "(5.0 / NULLIF(0, 0))");
    assert_eq!(expression_sql("5 mod 0", None), "MOD(5, NULLIF(0, 0))");
}

#[test]
fn male_not_deceased_filter() {
    // m0 male and deceasedBoolean false: selected
    // f0 female: the gender test fails
    // m1 deceasedBoolean true: the deceased test fails
    // f1 no deceased field: NULL = false is NULL, so not selected
    let translation = translator()
        .translate_filter(
            "gender = 'male' and deceased.ofType(boolean) = false",
            Some("Patient"),
        )
        .unwrap();
    let sql = &translation.sql;
    assert!(sql.contains("WHERE (r.resource ->> 'resourceType') = 'Patient' AND ("));
    assert!(sql.contains("((r.resource ->> 'gender') = 'male')"));
    assert!(sql.contains("FROM (SELECT (r.resource -> 'deceasedBoolean') AS v) AS b) = false)"));
    assert!(!sql.contains("deceasedDateTime"));
    assert_eq!(translation.kind, ValueKind::Boolean);
}

#[test]
fn choice_elements_coalesce_in_declared_order() {
    let sql = expression_sql("Observation.value", None);
    assert!(sql.starts_with("COALESCE((r.resource -> 'valueQuantity'), "));
    assert!(sql.ends_with("(r.resource -> 'valuePeriod'))"));

    let sql = expression_sql("Patient.deceased", None);
    assert_eq!(
        sql,
        "COALESCE((r.resource -> 'deceasedBoolean'), (r.resource -> 'deceasedDateTime'))"
    );
}

#[test]
fn custom_choice_type() {
    let config = TranslatorConfig::default().with_choice_type(ChoiceType::new(
        "Condition",
        "onset",
        &["onsetDateTime", "onsetAge"],
    ));
    let translator = Translator::new(MockDialect::new(), config).unwrap();
    let translation = translator
        .translate_expression("onset.ofType(dateTime)", Some("Condition"))
        .unwrap();
    assert_eq!(translation.sql, "(r.resource -> 'onsetDateTime')");
}

#[test]
fn select_query_hoists_filtered_navigation() {
    let translation = translator()
        .translate("Patient.name.where(use = 'official').family.first()", None)
        .unwrap();
    let sql = &translation.sql;
    assert!(sql.starts_with("WITH cte_1 AS (SELECT r.id AS row_key, "));
    assert!(sql.contains("jsonb_agg(it_1.value ORDER BY it_1.ordinal)"));
    assert!(sql.contains("(SELECT cte_1.value FROM cte_1 WHERE cte_1.row_key = r.id)"));
    assert!(sql.ends_with(
        "AS result FROM fhir_resources AS r WHERE (r.resource ->> 'resourceType') = 'Patient'"
    ));
    assert_eq!(translation.ctes.len(), 1);
    assert_eq!(translation.shape, Shape::Scalar);
}

#[test]
fn filter_query_keeps_navigation_inline() {
    let translation = translator()
        .translate_filter("name.given.exists()", Some("Patient"))
        .unwrap();
    assert!(!translation.sql.contains("WITH"));
    assert!(translation.sql.contains("jsonb_array_elements"));
    assert!(translation.ctes.is_empty());
}

#[test]
fn iteration_variables_project_window_columns() {
    let sql = expression_sql("name.where($index = 0 and $total > 1)", Some("Patient"));
    assert!(sql.contains("ROW_NUMBER() OVER (ORDER BY it_1.ordinal) - 1 AS idx"));
    assert!(sql.contains("COUNT(*) OVER () AS total"));
    assert!(sql.contains("(it_1.idx = 0)"));
    assert!(sql.contains("(it_1.total > 1)"));
}

#[test]
fn select_projects_in_element_order() {
    let sql = expression_sql("name.select(family)", Some("Patient"));
    assert!(sql.contains("jsonb_agg(it_2.v ORDER BY it_2.o)"));
    assert!(sql.contains("(it_1.value -> 'family') AS v, it_1.ordinal AS o"));
    assert!(sql.contains("WHERE it_2.v IS NOT NULL"));
}

#[test]
fn date_arithmetic_uses_intervals() {
    let sql = expression_sql("birthDate + 18 years <= today()", Some("Patient"));
    assert!(sql.contains("* INTERVAL '1 year')"));
    assert!(sql.contains("CURRENT_DATE"));
}

#[rstest]
#[case("name.count()", ValueKind::Numeric, Shape::Scalar)]
#[case("name.exists()", ValueKind::Boolean, Shape::Boolean)]
#[case("name.family.first().upper()", ValueKind::Text, Shape::Scalar)]
#[case("name.where(use = 'official')", ValueKind::Json, Shape::Collection)]
#[case("active and gender = 'male'", ValueKind::Boolean, Shape::Boolean)]
#[case("multipleBirthInteger.toString()", ValueKind::Text, Shape::Scalar)]
#[case("now()", ValueKind::Temporal(octofhir_fhirpath_sql::dialect::SqlType::DateTime), Shape::Scalar)]
fn translation_metadata(#[case] expr: &str, #[case] kind: ValueKind, #[case] shape: Shape) {
    let translation = translator()
        .translate_expression(expr, Some("Patient"))
        .unwrap();
    assert_eq!((translation.kind, translation.shape), (kind, shape));
}

#[rstest]
#[case("name.given.distinct().count()")]
#[case("telecom.where(system = 'phone').value.join(', ')")]
#[case("name.given.skip(1).take(2)")]
#[case("name.family | name.given")]
#[case("name.given.combine(name.family).isDistinct()")]
#[case("iif(active, name.family.first(), 'unknown')")]
#[case("extension('http://example.org/ext').exists()")]
#[case("generalPractitioner.getReferenceKey(Practitioner)")]
#[case("contact.telecom.value.ofType(string).exists()")]
#[case("name.given.allTrue() or name.given.anyFalse()")]
#[case("multipleBirthInteger.power(2) + multipleBirthInteger.abs().sqrt()")]
#[case("contact.count().sum() > 0")]
#[case("gender.matches('^ma') xor gender.length() > 4")]
#[case("name.all(given.exists() implies family.exists())")]
fn supported_expressions_translate(#[case] expr: &str) {
    let translator = translator();
    assert!(translator.translate(expr, Some("Patient")).is_ok(), "{expr}");
    assert!(translator.translate_filter(expr, Some("Patient")).is_ok(), "{expr}");
}

#[test]
fn translation_is_deterministic() {
    let expr = "Patient.name.where(use = 'official').given.first() | Patient.telecom.value";
    let first = translator().translate(expr, None).unwrap();
    let second = translator().translate(expr, None).unwrap();
    assert_eq!(first, second);

    let shared = translator();
    assert_eq!(
        shared.translate(expr, None).unwrap().sql,
        shared.translate(expr, None).unwrap().sql
    );
}

#[test]
fn concurrent_translations_do_not_share_state() {
    let translator = Arc::new(translator());
    let expected = translator.translate("name.given", Some("Patient")).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let translator = Arc::clone(&translator);
            thread::spawn(move || translator.translate("name.given", Some("Patient")).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn custom_table_layout() {
    let config = TranslatorConfig::default()
        .with_table("resources", "res")
        .with_columns("resource_id", "content");
    let translator = Translator::new(MockDialect::new(), config).unwrap();
    let translation = translator.translate("gender", Some("Patient")).unwrap();
    assert_eq!(
        translation.sql,
        "SELECT res.resource_id, (res.content -> 'gender') AS result FROM resources AS res \
         WHERE (res.content ->> 'resourceType') = 'Patient'"
    );
}

#[test]
fn convenience_function() {
    let sql = translate("Patient.active", &MockDialect::new(), None).unwrap();
    assert_eq!(
        sql,
        "SELECT r.id, (r.resource -> 'active') AS result FROM fhir_resources AS r \
         WHERE (r.resource ->> 'resourceType') = 'Patient'"
    );
}
