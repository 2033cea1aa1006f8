//! UCP Schema Compiler
//!
//! Compiles a corpus of interlinked JSON Schema files into typed Rust
//! validation modules.
//!
//! The pipeline runs strictly forward: a schema is loaded, its references
//! and compositions are resolved, every property is mapped to a
//! [`TypeDescriptor`], and a [`ModuleSpec`] is rendered as Rust source.
//!
//! # Example
//!
//! ```
//! use ucp_codegen::{load_schema_str, render, CompileOptions, ModuleSpec, Resolver};
//!
//! let doc = load_schema_str(
//!     r##"{
//!         "title": "Checkout",
//!         "required": ["currency"],
//!         "$defs": { "status": { "enum": ["incomplete", "completed"] } },
//!         "properties": {
//!             "currency": { "type": "string" },
//!             "status": { "$ref": "#/$defs/status" }
//!         }
//!     }"##,
//!     "/schemas/shopping/checkout.json",
//! )
//! .unwrap();
//!
//! let resolver = Resolver::new(CompileOptions::new().prefix("Example.Schemas"));
//! let resolved = resolver.resolve(&doc).unwrap();
//! let spec = ModuleSpec::from_resolved(&resolved, "Example.Schemas.Shopping.Checkout", "checkout.json");
//!
//! assert_eq!(spec.required_fields, vec!["currency"]);
//! let source = render(&spec);
//! assert!(source.contains("pub const STATUS_VALUES: &[&str] = &[\"incomplete\", \"completed\"];"));
//! ```
//!
//! # Reference handling
//!
//! | Reference | Result |
//! |-----------|--------|
//! | `#/$defs/x` | Inlined; reference-site keys win |
//! | `other.json` | Linked by module name (`_ref_module`), not inlined |
//! | `other.json#/$defs/x` | Linked by module name plus definition segment |

mod compiler;
mod error;
mod generator;
mod loader;
mod module_spec;
mod namespace;
mod resolver;
mod type_mapper;
mod types;

pub use compiler::{BatchReport, CompiledModule, Compiler, FileOutcome, OutcomeStatus, MOD_INDEX};
pub use error::{CompileError, GenerateError, LoadError, ResolveError};
pub use generator::{field_ident, record_ident, render, render_mod_index, CodeWriter};
pub use loader::{
    absolute_path, collect_schema_files, is_generatable, load_schema, load_schema_from,
    load_schema_str, metadata, navigate_pointer, normalize_path, FsSource, SchemaSource,
};
pub use module_spec::{snake_case, DeclarationKind, EnumDeclaration, FieldDescriptor, ModuleSpec};
pub use namespace::{detect_schema_root, is_version_segment, Namespace};
pub use resolver::{deep_merge, CacheKey, ResolutionCache, Resolver};
pub use type_mapper::{
    map_direct, map_type, required_names, symbol, Composition, PrimitiveKind, StringFormat,
    TypeDescriptor, Variant,
};
pub use types::{
    json_type_name, CompileOptions, SchemaDocument, SchemaMetadata, COMPOSITION_KEY,
    DEFAULT_MODULE_PREFIX, REF_DEFINITION_KEY, REF_KEY, REF_MODULE_KEY, SOURCE_KEY,
};
