//! # cosign-schema: Export Schema Validation
//!
//! Every signed-contract artifact is checked against
//! `signed-contract.schema.json` before export. The validator either uses
//! the schema compiled into this crate or loads a schema directory chosen
//! by the operator.
//!
//! - [`SchemaValidator::validate_signed_contract`] validates one merged
//!   artifact.
//! - [`SchemaValidator::validate_file`] validates an artifact on disk, as
//!   `cosign verify` does.
//!
//! ## Crate Policy
//!
//! - No internal dependencies. Artifacts arrive as `serde_json::Value`.
//! - Schema `$id` URIs must not change without updating every `$ref`.
//! - Invalid artifacts are rejected with structured violations, never
//!   silently accepted.

pub mod validate;

pub use validate::{
    SchemaValidationError, SchemaValidator, ValidationViolations, Violation, SIGNED_CONTRACT_SCHEMA,
};
