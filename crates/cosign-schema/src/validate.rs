//! # Export Validation
//!
//! Validates merged signed-contract artifacts against JSON Schema
//! (Draft 2020-12) before they leave the process.
//!
//! ## Security Invariant
//!
//! Export is a trust boundary. An artifact that fails validation is never
//! written; the caller gets every violation with its instance path and the
//! schema rule it broke.
//!
//! ## Schema Sources
//!
//! [`SchemaValidator::builtin()`] carries `signed-contract.schema.json`
//! compiled into the binary. [`SchemaValidator::new()`] loads every
//! `*.schema.json` from a directory instead, so an operator can tighten
//! the export contract without rebuilding. Cross-schema `$ref`s resolve
//! against the loaded set only; nothing is fetched from the network.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use jsonschema::{Retrieve, Uri, ValidationOptions, Validator};
use serde_json::Value;
use thiserror::Error;

/// Filename of the signed-contract export schema.
pub const SIGNED_CONTRACT_SCHEMA: &str = "signed-contract.schema.json";

/// `$id` prefix of the schemas shipped with this workspace.
const SCHEMA_URI_PREFIX: &str = "https://schemas.cosign.invalid/";

const BUILTIN_SIGNED_CONTRACT: &str =
    include_str!("../../../schemas/signed-contract.schema.json");

/// Resolves `$ref` URIs against schemas already held in memory.
struct LocalSchemaRetriever {
    schemas_by_uri: HashMap<String, Value>,
}

impl Retrieve for LocalSchemaRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();
        if let Some(value) = self.schemas_by_uri.get(uri_str) {
            return Ok(value.clone());
        }

        let filename = uri_str.rsplit('/').next().unwrap_or(uri_str);
        self.schemas_by_uri
            .get(&format!("{SCHEMA_URI_PREFIX}{filename}"))
            .or_else(|| self.schemas_by_uri.get(filename))
            .cloned()
            .ok_or_else(|| format!("unresolved schema reference: {uri_str}").into())
    }
}

/// Error during schema validation.
#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// The document did not conform to the schema.
    #[error("validation failed against schema '{schema_name}':\n{violations}")]
    ValidationFailed {
        /// Name of the schema that was validated against.
        schema_name: String,
        /// Every individual violation.
        violations: ValidationViolations,
    },

    /// The schema could not be loaded.
    #[error("schema load error for '{schema_name}': {reason}")]
    SchemaLoadError {
        /// Schema filename or directory.
        schema_name: String,
        /// Why loading failed.
        reason: String,
    },

    /// The document file could not be read or parsed.
    #[error("document load error for '{path}': {reason}")]
    DocumentLoadError {
        /// Path to the document.
        path: String,
        /// Why loading failed.
        reason: String,
    },

    /// The schema is not a valid JSON Schema.
    #[error("validator build error for schema '{schema_name}': {reason}")]
    ValidatorBuildError {
        /// Schema filename.
        schema_name: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// IO error reading a schema directory.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchemaValidationError {
    /// The violations, if this is a validation failure.
    pub fn violations(&self) -> Option<&[Violation]> {
        match self {
            Self::ValidationFailed { violations, .. } => Some(violations.violations()),
            _ => None,
        }
    }
}

/// A single validation violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer to the violating value in the instance.
    pub instance_path: String,
    /// JSON Pointer to the schema rule that failed.
    pub schema_path: String,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Collection of validation violations.
#[derive(Debug, Clone, Default)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    /// Number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// True if there are none.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// All violations, in the order the validator reported them.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consume into the inner list.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// A set of loaded schemas plus the means to validate against them.
///
/// `Send + Sync`; load once and share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    /// Directory the schemas came from; `None` for the built-in set.
    schema_dir: Option<PathBuf>,
    /// Schema filename → parsed schema.
    schemas: HashMap<String, Value>,
}

impl SchemaValidator {
    /// Load every `*.schema.json` file in `schema_dir`.
    ///
    /// # Errors
    ///
    /// `SchemaLoadError` if the directory cannot be read or a schema file is
    /// not valid JSON.
    pub fn new(schema_dir: impl AsRef<Path>) -> Result<Self, SchemaValidationError> {
        let schema_dir = schema_dir.as_ref().to_path_buf();
        let mut schemas = HashMap::new();

        let entries = std::fs::read_dir(&schema_dir).map_err(|e| {
            SchemaValidationError::SchemaLoadError {
                schema_name: schema_dir.display().to_string(),
                reason: format!("cannot read schema directory: {e}"),
            }
        })?;

        for entry in entries {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(".schema.json") {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            let value: Value = serde_json::from_str(&content).map_err(|e| {
                SchemaValidationError::SchemaLoadError {
                    schema_name: name.to_string(),
                    reason: format!("invalid JSON: {e}"),
                }
            })?;
            schemas.insert(name.to_string(), value);
        }

        tracing::debug!(
            dir = %schema_dir.display(),
            count = schemas.len(),
            "loaded export schemas"
        );
        Ok(Self {
            schema_dir: Some(schema_dir),
            schemas,
        })
    }

    /// The schemas compiled into this crate.
    pub fn builtin() -> Result<Self, SchemaValidationError> {
        let value: Value = serde_json::from_str(BUILTIN_SIGNED_CONTRACT).map_err(|e| {
            SchemaValidationError::SchemaLoadError {
                schema_name: SIGNED_CONTRACT_SCHEMA.to_string(),
                reason: format!("invalid JSON: {e}"),
            }
        })?;
        Ok(Self {
            schema_dir: None,
            schemas: HashMap::from([(SIGNED_CONTRACT_SCHEMA.to_string(), value)]),
        })
    }

    /// Directory the schemas were loaded from, if any.
    pub fn schema_dir(&self) -> Option<&Path> {
        self.schema_dir.as_deref()
    }

    /// Number of loaded schemas.
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Loaded schema names, sorted.
    pub fn schema_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Look up a loaded schema by filename.
    pub fn get_schema(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    fn build_options(&self) -> ValidationOptions {
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft202012);

        let mut schemas_by_uri: HashMap<String, Value> = HashMap::new();
        for (filename, value) in &self.schemas {
            schemas_by_uri.insert(format!("{SCHEMA_URI_PREFIX}{filename}"), value.clone());
            if let Some(id) = value.get("$id").and_then(Value::as_str) {
                schemas_by_uri.insert(id.to_string(), value.clone());
            }
            schemas_by_uri.insert(filename.clone(), value.clone());
        }
        opts.with_retriever(LocalSchemaRetriever { schemas_by_uri });
        opts
    }

    /// Compile a validator for the named schema.
    ///
    /// # Errors
    ///
    /// `SchemaLoadError` if the schema is not loaded, `ValidatorBuildError`
    /// if it does not compile.
    pub fn build_validator(&self, schema_name: &str) -> Result<Validator, SchemaValidationError> {
        let schema_value = self.schemas.get(schema_name).ok_or_else(|| {
            SchemaValidationError::SchemaLoadError {
                schema_name: schema_name.to_string(),
                reason: match &self.schema_dir {
                    Some(dir) => format!("schema not found in {}", dir.display()),
                    None => "schema not built in".to_string(),
                },
            }
        })?;

        self.build_options()
            .build(schema_value)
            .map_err(|e| SchemaValidationError::ValidatorBuildError {
                schema_name: schema_name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Validate a JSON value against a named schema.
    pub fn validate_document(
        &self,
        instance: &Value,
        schema_name: &str,
    ) -> Result<(), SchemaValidationError> {
        let validator = self.build_validator(schema_name)?;

        let violations: Vec<Violation> = validator
            .iter_errors(instance)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaValidationError::ValidationFailed {
                schema_name: schema_name.to_string(),
                violations: ValidationViolations { violations },
            })
        }
    }

    /// Validate a signed-contract artifact.
    pub fn validate_signed_contract(&self, instance: &Value) -> Result<(), SchemaValidationError> {
        self.validate_document(instance, SIGNED_CONTRACT_SCHEMA)
    }

    /// Read a JSON file and validate it against a named schema.
    pub fn validate_file(
        &self,
        document_path: &Path,
        schema_name: &str,
    ) -> Result<(), SchemaValidationError> {
        let load_error = |reason: String| SchemaValidationError::DocumentLoadError {
            path: document_path.display().to_string(),
            reason,
        };
        let content = std::fs::read_to_string(document_path)
            .map_err(|e| load_error(format!("cannot read file: {e}")))?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| load_error(format!("invalid JSON: {e}")))?;
        self.validate_document(&value, schema_name)
    }
}
