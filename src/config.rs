//! Translator configuration
//!
//! Everything the generator needs to know about the target schema and the
//! FHIR vocabulary lives here, owned by one [`Translator`](crate::Translator).
//!
//! # Examples
//!
//! ```rust
//! use octofhir_fhirpath_sql::TranslatorConfig;
//!
//! let config = TranslatorConfig::default()
//!     .with_table("patients", "p")
//!     .with_max_parse_depth(50);
//! assert_eq!(config.table_alias, "p");
//! ```

use crate::error::{TranslationError, TranslationResult};
use serde::{Deserialize, Serialize};

/// Configuration of a [`Translator`](crate::Translator)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Table holding one resource per row. Default: `fhir_resources`
    pub table: String,
    /// Alias of that table in generated queries. Default: `r`
    pub table_alias: String,
    /// Row key column. Default: `id`
    pub id_column: String,
    /// JSON document column. Default: `resource`
    pub json_column: String,
    /// Field inside the document naming the resource type. Default: `resourceType`
    pub resource_type_field: String,
    /// Maximum parser nesting. Default: 100
    pub max_parse_depth: usize,
    /// Maximum generator nesting. Default: 100
    pub max_generation_depth: usize,
    /// Field and function vocabularies
    pub fields: FieldClassification,
    /// Choice elements resolved by coalescing their concrete variants
    pub choice_types: Vec<ChoiceType>,
    /// Common table expression heuristics
    pub cte: CteConfig,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            table: "fhir_resources".to_string(),
            table_alias: "r".to_string(),
            id_column: "id".to_string(),
            json_column: "resource".to_string(),
            resource_type_field: "resourceType".to_string(),
            max_parse_depth: 100,
            max_generation_depth: 100,
            fields: FieldClassification::default(),
            choice_types: ChoiceType::defaults(),
            cte: CteConfig::default(),
        }
    }
}

impl TranslatorConfig {
    /// Create new configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON configuration; missing keys take their defaults
    pub fn from_json(json: &str) -> TranslationResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| TranslationError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the resource table and its alias
    pub fn with_table(mut self, table: impl Into<String>, alias: impl Into<String>) -> Self {
        self.table = table.into();
        self.table_alias = alias.into();
        self
    }

    /// Set the row key and JSON document columns
    pub fn with_columns(mut self, id_column: impl Into<String>, json_column: impl Into<String>) -> Self {
        self.id_column = id_column.into();
        self.json_column = json_column.into();
        self
    }

    /// Set the parser depth limit
    pub fn with_max_parse_depth(mut self, depth: usize) -> Self {
        self.max_parse_depth = depth;
        self
    }

    /// Set the generator depth limit
    pub fn with_max_generation_depth(mut self, depth: usize) -> Self {
        self.max_generation_depth = depth;
        self
    }

    /// Replace the CTE heuristics
    pub fn with_cte(mut self, cte: CteConfig) -> Self {
        self.cte = cte;
        self
    }

    /// Register an additional choice element
    pub fn with_choice_type(mut self, choice: ChoiceType) -> Self {
        self.choice_types.push(choice);
        self
    }

    /// Reject configurations that cannot produce valid SQL
    pub fn validate(&self) -> TranslationResult<()> {
        let names = [
            ("table", &self.table),
            ("table_alias", &self.table_alias),
            ("id_column", &self.id_column),
            ("json_column", &self.json_column),
            ("resource_type_field", &self.resource_type_field),
            ("cte.name_prefix", &self.cte.name_prefix),
        ];
        for (key, value) in names {
            if value.trim().is_empty() {
                return Err(TranslationError::InvalidConfig(format!("{key} must not be empty")));
            }
        }
        if self.max_parse_depth == 0 || self.max_generation_depth == 0 {
            return Err(TranslationError::InvalidConfig(
                "depth limits must be greater than zero".to_string(),
            ));
        }
        if let Some(choice) = self.choice_types.iter().find(|c| c.variants.is_empty()) {
            return Err(TranslationError::InvalidConfig(format!(
                "choice element {}.{} has no variants",
                choice.resource_type, choice.element
            )));
        }
        Ok(())
    }

    /// Choice element declared for a resource type
    pub fn choice_type(&self, resource_type: &str, element: &str) -> Option<&ChoiceType> {
        self.choice_types
            .iter()
            .find(|c| c.resource_type == resource_type && c.element == element)
    }
}

/// Vocabularies that replace hard-coded field lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldClassification {
    /// Fields holding JSON booleans; any field ending in `Boolean` also counts
    pub boolean_fields: Vec<String>,
    /// Fields holding text, used to pick string concatenation for `+`
    pub string_fields: Vec<String>,
    /// Functions returning text
    pub string_functions: Vec<String>,
    /// Fields that are arrays in FHIR resources
    pub array_fields: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl Default for FieldClassification {
    fn default() -> Self {
        Self {
            boolean_fields: strings(&[
                "active",
                "deceasedBoolean",
                "multipleBirthBoolean",
                "valueBoolean",
                "experimental",
            ]),
            string_fields: strings(&[
                "name",
                "family",
                "given",
                "prefix",
                "suffix",
                "value",
                "display",
                "text",
                "code",
                "status",
                "system",
                "use",
                "gender",
                "id",
                "url",
                "reference",
                "unit",
                "city",
                "state",
                "country",
                "line",
                "postalCode",
                "description",
                "title",
            ]),
            string_functions: strings(&[
                "toString",
                "upper",
                "lower",
                "trim",
                "substring",
                "replace",
                "join",
            ]),
            array_fields: strings(&[
                "name",
                "given",
                "prefix",
                "suffix",
                "line",
                "telecom",
                "address",
                "identifier",
                "coding",
                "extension",
                "contact",
                "communication",
                "link",
                "category",
                "performer",
                "component",
                "referenceRange",
                "interpretation",
                "note",
                "reasonCode",
                "photo",
                "generalPractitioner",
            ]),
        }
    }
}

impl FieldClassification {
    /// Whether `field` holds a JSON boolean
    pub fn is_boolean_field(&self, field: &str) -> bool {
        field.ends_with("Boolean") || self.boolean_fields.iter().any(|f| f == field)
    }

    /// Whether `name` is a text field or a text-returning function
    pub fn is_string_valued(&self, name: &str) -> bool {
        self.string_fields.iter().any(|f| f == name)
            || self.string_functions.iter().any(|f| f == name)
    }

    /// Whether `field` is an array in FHIR resources
    pub fn is_array_field(&self, field: &str) -> bool {
        self.array_fields.iter().any(|f| f == field)
    }
}

/// A choice element (`value[x]`) and its concrete fields, in resolution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceType {
    /// Resource type declaring the element
    pub resource_type: String,
    /// Element name without the type suffix
    pub element: String,
    /// Concrete field names; the first non-null wins
    pub variants: Vec<String>,
}

impl ChoiceType {
    /// Create a choice element declaration
    pub fn new(
        resource_type: impl Into<String>,
        element: impl Into<String>,
        variants: &[&str],
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            element: element.into(),
            variants: strings(variants),
        }
    }

    /// `Observation.value` and `Patient.deceased`
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(
                "Observation",
                "value",
                &[
                    "valueQuantity",
                    "valueCodeableConcept",
                    "valueString",
                    "valueBoolean",
                    "valueInteger",
                    "valueRange",
                    "valueRatio",
                    "valueSampledData",
                    "valueTime",
                    "valueDateTime",
                    "valuePeriod",
                ],
            ),
            Self::new("Patient", "deceased", &["deceasedBoolean", "deceasedDateTime"]),
        ]
    }

    /// Concrete field for a FHIRPath type name (`boolean` gives `deceasedBoolean`)
    pub fn variant_for_type(&self, type_name: &str) -> Option<&str> {
        let type_name = type_name
            .strip_prefix("FHIR.")
            .or_else(|| type_name.strip_prefix("System."))
            .unwrap_or(type_name);
        let mut chars = type_name.chars();
        let suffix: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => return None,
        };
        let wanted = format!("{}{}", self.element, suffix);
        self.variants
            .iter()
            .find(|v| v.eq_ignore_ascii_case(&wanted))
            .map(String::as_str)
    }
}

/// Heuristics deciding when array navigation becomes a common table expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CteConfig {
    /// Master switch. Default: true
    pub enabled: bool,
    /// Hoist every eligible fragment outside WHERE contexts. Default: true
    pub hoist_outside_where: bool,
    /// Hoist when array navigation nests deeper than this. Default: 3
    pub max_inline_nesting: usize,
    /// Hoist when the fragment text is longer than this. Default: 2000
    pub max_inline_length: usize,
    /// Hoist when the fragment holds more subqueries than this. Default: 4
    pub max_inline_subqueries: usize,
    /// Prefix of generated names. Default: `cte`
    pub name_prefix: String,
}

impl Default for CteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hoist_outside_where: true,
            max_inline_nesting: 3,
            max_inline_length: 2000,
            max_inline_subqueries: 4,
            name_prefix: "cte".to_string(),
        }
    }
}

impl CteConfig {
    /// Never hoist
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Hoist only when a complexity or repetition trigger fires
    pub fn heuristic_only() -> Self {
        Self {
            hoist_outside_where: false,
            ..Self::default()
        }
    }
}
