//! Core types shared across the compiler pipeline.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

/// Default namespace prefix for derived module names.
pub const DEFAULT_MODULE_PREFIX: &str = "Ucp.Schemas";

/// Original `$ref` string, kept on every resolved reference site.
pub const REF_KEY: &str = "_ref";

/// Target module of a cross-file reference. Only present on links that were not inlined.
pub const REF_MODULE_KEY: &str = "_ref_module";

/// Derived name of a locally inlined definition (traceability only).
pub const REF_DEFINITION_KEY: &str = "_ref_definition";

/// Resolved composition branches: `{"kind": "all_of" | "one_of" | "any_of", "branches": [...]}`.
pub const COMPOSITION_KEY: &str = "_composition";

/// Absolute source path, set on the resolved root.
pub const SOURCE_KEY: &str = "_source";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A decoded schema file together with its absolute source path.
///
/// Never mutated after load; resolution produces a new tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    path: PathBuf,
    root: Value,
}

impl SchemaDocument {
    pub(crate) fn new(path: PathBuf, root: Value) -> Self {
        Self { path, root }
    }

    /// Absolute path of the file this document was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decoded JSON root (always an object).
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// File name of the source, e.g. `buyer.json`.
    pub fn basename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Descriptive projection of a schema document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaMetadata {
    pub id: Option<String>,
    pub schema_version: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub declared_type: Option<String>,
    pub required: Vec<String>,
    pub has_definitions: bool,
    pub has_all_of: bool,
    pub has_one_of: bool,
    pub has_any_of: bool,
}

/// Options for one compilation (single file or batch).
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Namespace prefix prepended to every derived module name.
    pub module_prefix: String,
    /// Explicit schema root. When unset the root is detected from the file path.
    pub schema_root: Option<PathBuf>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl CompileOptions {
    /// Create options with the default prefix and automatic root detection.
    pub fn new() -> Self {
        Self {
            module_prefix: DEFAULT_MODULE_PREFIX.to_string(),
            schema_root: None,
        }
    }

    /// Set the module prefix. Surrounding dots are trimmed.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.module_prefix = prefix.into().trim_matches('.').to_string();
        self
    }

    /// Pin the schema root instead of detecting it.
    pub fn schema_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.schema_root = Some(root.into());
        self
    }
}
