//! Language-independent description of one generated module.
//!
//! A [`ModuleSpec`] fully determines the emitted source. Fields are sorted
//! by name and enumerations are hoisted into named declarations, so
//! unchanged input always yields an identical spec.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::GenerateError;
use crate::type_mapper::{map_direct, map_type, required_names, TypeDescriptor};
use crate::types::SchemaDocument;

/// Whether a hoisted declaration is a value set or a single fixed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Enum,
    Const,
}

/// A named constant hoisted above the field table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumDeclaration {
    /// Constant name, e.g. `STATUS_VALUES`.
    pub name: String,
    pub kind: DeclarationKind,
    /// Symbols in declaration order; exactly one for `Const`.
    pub symbols: Vec<Value>,
}

/// One entry of the generated field table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    pub description: Option<String>,
    pub required: bool,
    pub default: Option<Value>,
}

/// Everything the generator needs to emit one module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleSpec {
    pub module_name: String,
    pub doc_title: Option<String>,
    pub doc_description: Option<String>,
    pub source_file_basename: String,
    pub enum_declarations: Vec<EnumDeclaration>,
    /// Sorted by name.
    pub fields: Vec<FieldDescriptor>,
    /// Sorted, de-duplicated.
    pub required_fields: Vec<String>,
}

impl ModuleSpec {
    /// Build from a resolved tree.
    ///
    /// Fields come from `properties`. A root without `properties` but with
    /// `oneOf`/`anyOf` takes the union of its inline branches' properties;
    /// a field is then required only if every branch requires it.
    pub fn from_resolved(resolved: &Value, module_name: &str, basename: &str) -> Self {
        let (fields, required) = match resolved.get("properties").and_then(Value::as_object) {
            Some(props) => (collect_fields(props, map_type), required_names(resolved)),
            None => alternative_fields(resolved, map_type),
        };
        assemble(resolved, module_name, basename, fields, required)
    }

    /// Build directly from the unresolved document (fallback path).
    ///
    /// References are not followed. Root `allOf` branches that are inline
    /// contribute their properties; the root's own properties win.
    ///
    /// # Errors
    ///
    /// Returns `GenerateError::Unsupported` if `properties` or a composition
    /// keyword doesn't have the expected shape.
    pub fn from_document(document: &SchemaDocument, module_name: &str) -> Result<Self, GenerateError> {
        let root = document.root();
        let mut props = Map::new();
        let mut required = Vec::new();

        if let Some(all_of) = root.get("allOf") {
            let branches = all_of.as_array().ok_or_else(|| unsupported("`allOf` must be an array"))?;
            for branch in branches.iter().filter(|b| b.get("$ref").is_none()) {
                if let Some(branch_props) = branch.get("properties") {
                    props.extend(properties_of(branch_props)?.clone());
                }
                required.extend(required_names(branch));
            }
        }

        let (fields, required) = match root.get("properties") {
            Some(own) => {
                props.extend(properties_of(own)?.clone());
                required.extend(required_names(root));
                (collect_fields(&props, map_direct), required)
            }
            None if !props.is_empty() => (collect_fields(&props, map_direct), required),
            None => {
                for keyword in ["oneOf", "anyOf"] {
                    if root.get(keyword).is_some_and(|v| !v.is_array()) {
                        return Err(unsupported(&format!("`{}` must be an array", keyword)));
                    }
                }
                alternative_fields(root, map_direct)
            }
        };

        for (name, schema) in &props {
            if !schema.is_object() {
                return Err(unsupported(&format!(
                    "property `{}` is not a schema object",
                    name
                )));
            }
        }

        Ok(assemble(
            root,
            module_name,
            &document.basename(),
            fields,
            required,
        ))
    }

    /// Hoisted declaration holding exactly `symbols`, if any.
    pub fn declaration(&self, kind: DeclarationKind, symbols: &[Value]) -> Option<&EnumDeclaration> {
        self.enum_declarations
            .iter()
            .find(|d| d.kind == kind && d.symbols == symbols)
    }

    /// Final segment of the module name, e.g. `Buyer`.
    pub fn record_name(&self) -> &str {
        self.module_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.module_name)
    }
}

fn unsupported(message: &str) -> GenerateError {
    GenerateError::Unsupported {
        message: message.to_string(),
    }
}

fn properties_of(value: &Value) -> Result<&Map<String, Value>, GenerateError> {
    value
        .as_object()
        .ok_or_else(|| unsupported("`properties` must be an object"))
}

fn collect_fields(
    props: &Map<String, Value>,
    mapper: fn(&Value) -> TypeDescriptor,
) -> Vec<FieldDescriptor> {
    props
        .iter()
        .map(|(name, schema)| FieldDescriptor {
            name: name.clone(),
            ty: mapper(schema),
            description: schema
                .get("description")
                .and_then(Value::as_str)
                .map(String::from),
            required: false,
            default: schema.get("default").cloned(),
        })
        .collect()
}

fn alternative_fields(
    root: &Value,
    mapper: fn(&Value) -> TypeDescriptor,
) -> (Vec<FieldDescriptor>, Vec<String>) {
    let branches = ["oneOf", "anyOf"]
        .iter()
        .find_map(|k| root.get(*k).and_then(Value::as_array));
    let Some(branches) = branches else {
        return (Vec::new(), Vec::new());
    };

    let mut props = Map::new();
    for branch in branches {
        if let Some(branch_props) = branch.get("properties").and_then(Value::as_object) {
            for (name, schema) in branch_props {
                if !props.contains_key(name) {
                    props.insert(name.clone(), schema.clone());
                }
            }
        }
    }

    let mut required: Option<BTreeSet<String>> = None;
    for branch in branches {
        let names: BTreeSet<String> = required_names(branch).into_iter().collect();
        required = Some(match required {
            Some(acc) => acc.intersection(&names).cloned().collect(),
            None => names,
        });
    }

    (
        collect_fields(&props, mapper),
        required.unwrap_or_default().into_iter().collect(),
    )
}

fn assemble(
    root: &Value,
    module_name: &str,
    basename: &str,
    mut fields: Vec<FieldDescriptor>,
    required: Vec<String>,
) -> ModuleSpec {
    let required: BTreeSet<String> = required.into_iter().collect();
    for field in &mut fields {
        field.required = required.contains(&field.name);
    }
    fields.sort_by(|a, b| a.name.cmp(&b.name));

    let mut enum_declarations = Vec::new();
    for field in &fields {
        hoist(&mut enum_declarations, &field.name, &field.ty);
    }

    let text = |key: &str| root.get(key).and_then(Value::as_str).map(String::from);
    ModuleSpec {
        module_name: module_name.to_string(),
        doc_title: text("title"),
        doc_description: text("description"),
        source_file_basename: basename.to_string(),
        enum_declarations,
        fields,
        required_fields: required.into_iter().collect(),
    }
}

fn hoist(declarations: &mut Vec<EnumDeclaration>, field: &str, ty: &TypeDescriptor) {
    match ty {
        TypeDescriptor::Enum(symbols) => {
            declare(declarations, field, DeclarationKind::Enum, symbols.clone())
        }
        TypeDescriptor::Const(symbol) => {
            declare(declarations, field, DeclarationKind::Const, vec![symbol.clone()])
        }
        TypeDescriptor::ArrayOf(inner) => hoist(declarations, field, inner),
        TypeDescriptor::VariantOf(_, variants) => {
            for variant in variants {
                hoist(declarations, field, &variant.descriptor);
            }
        }
        _ => {}
    }
}

fn declare(
    declarations: &mut Vec<EnumDeclaration>,
    field: &str,
    kind: DeclarationKind,
    symbols: Vec<Value>,
) {
    if declarations
        .iter()
        .any(|d| d.kind == kind && d.symbols == symbols)
    {
        return;
    }

    let suffix = match kind {
        DeclarationKind::Enum => "VALUES",
        DeclarationKind::Const => "VALUE",
    };
    let stem = snake_case(field).to_ascii_uppercase();
    let stem = if stem.is_empty() || stem.starts_with(|c: char| c.is_ascii_digit()) {
        format!("F_{}", stem)
    } else {
        stem
    };
    let base = format!("{}_{}", stem, suffix);

    let mut name = base.clone();
    let mut n = 2;
    while declarations.iter().any(|d| d.name == name) {
        name = format!("{}_{}", base, n);
        n += 1;
    }
    declarations.push(EnumDeclaration {
        name,
        kind,
        symbols,
    });
}

/// `lineItems`, `line-items`, `Line Items` -> `line_items`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if c.is_ascii_uppercase() {
                if prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit()) {
                    out.push('_');
                }
                out.push(c.to_ascii_lowercase());
            } else {
                out.push(c);
            }
            prev = Some(c);
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev = None;
        }
    }
    out.trim_end_matches('_').to_string()
}
