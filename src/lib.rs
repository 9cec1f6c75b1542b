//! FHIRPath to SQL compiler
//!
//! Compiles FHIRPath expressions into SQL that runs against a table of FHIR
//! resources stored as JSON documents. Backend-specific SQL is produced
//! through the [`Dialect`] trait; the rest of the pipeline is shared:
//!
//! text → [`parser`] → [`ast`] → [`generator`] → [`cte`] → SQL
//!
//! ```
//! use octofhir_fhirpath_sql::{MockDialect, Translator, TranslatorConfig};
//!
//! let translator = Translator::new(MockDialect::new(), TranslatorConfig::default()).unwrap();
//! let translation = translator
//!     .translate_filter("gender = 'male' and active", Some("Patient"))
//!     .unwrap();
//! assert!(translation.sql.starts_with("SELECT r.id, r.resource FROM fhir_resources AS r WHERE"));
//! assert!(translation.sql.contains("(r.resource ->> 'gender') = 'male'"));
//! ```

pub mod ast;
pub mod config;
pub mod cte;
pub mod dialect;
pub mod error;
pub mod generator;
pub mod parser;
pub mod translator;

pub use ast::ExpressionNode;
pub use config::{ChoiceType, CteConfig, FieldClassification, TranslatorConfig};
pub use cte::{CteBuilder, CteDecision, CteRegistry, HoistReason};
pub use dialect::{Dialect, DialectError, DialectResult, JsonPath, MockDialect};
pub use error::{TranslationError, TranslationResult};
pub use generator::{ExtractionContext, Fragment, Shape, ValueKind};
pub use parser::{ParseError, parse_expression as parse};
pub use translator::{Translation, Translator, translate};
