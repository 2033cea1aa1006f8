//! Mapping resolved property schemas to type descriptors.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::{COMPOSITION_KEY, REF_MODULE_KEY};

/// JSON primitive shapes a field can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Integer,
    Number,
    Boolean,
    Object,
}

impl PrimitiveKind {
    /// Parse a JSON Schema `type` keyword. `array` and `null` are not primitives here.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(PrimitiveKind::String),
            "integer" => Some(PrimitiveKind::Integer),
            "number" => Some(PrimitiveKind::Number),
            "boolean" => Some(PrimitiveKind::Boolean),
            "object" => Some(PrimitiveKind::Object),
            _ => None,
        }
    }
}

/// String formats that change the stored shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StringFormat {
    /// RFC 3339 `date-time`.
    DateTime,
}

/// Composition keyword a variant set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Composition {
    AllOf,
    OneOf,
    AnyOf,
}

impl Composition {
    /// Parse the `_composition.kind` tag written by the resolver.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "all_of" => Some(Composition::AllOf),
            "one_of" => Some(Composition::OneOf),
            "any_of" => Some(Composition::AnyOf),
            _ => None,
        }
    }
}

/// One alternative of a [`TypeDescriptor::VariantOf`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variant {
    pub descriptor: TypeDescriptor,
    /// Fields the branch declares as required; drives branch selection.
    pub required: Vec<String>,
}

/// Stored shape of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    FormattedString(StringFormat),
    /// Closed symbol set, in declaration order. Values keep their JSON type,
    /// so `"1"` and `1` are different symbols.
    Enum(Vec<Value>),
    Const(Value),
    ArrayOf(Box<TypeDescriptor>),
    /// Link to another generated module.
    Reference(String),
    VariantOf(Composition, Vec<Variant>),
    /// Untyped structured value.
    Opaque,
}

impl TypeDescriptor {
    /// Returns true for shapes the direct (fallback) pass can type precisely.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Primitive(_)
                | TypeDescriptor::FormattedString(_)
                | TypeDescriptor::Enum(_)
                | TypeDescriptor::Const(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Resolved,
    Direct,
}

/// Map a resolved property schema.
///
/// Priority: cross-file link, `enum`, `const`, `array`, `string`
/// (with `date-time`), other primitives, compositions, then `Opaque`.
pub fn map_type(node: &Value) -> TypeDescriptor {
    map_with(node, Mode::Resolved)
}

/// Map an unresolved property schema without following references.
///
/// Used when full resolution fails: `$ref` becomes `Opaque`, arrays only
/// keep scalar item types, compositions are read from the raw keywords.
pub fn map_direct(node: &Value) -> TypeDescriptor {
    map_with(node, Mode::Direct)
}

/// Render an `enum`/`const` value as a symbol.
pub fn symbol(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn map_with(node: &Value, mode: Mode) -> TypeDescriptor {
    let Some(map) = node.as_object() else {
        return TypeDescriptor::Opaque;
    };

    match mode {
        Mode::Resolved => {
            if let Some(module) = map.get(REF_MODULE_KEY).and_then(Value::as_str) {
                return TypeDescriptor::Reference(module.to_string());
            }
        }
        Mode::Direct => {
            if map.contains_key("$ref") {
                return TypeDescriptor::Opaque;
            }
        }
    }

    if let Some(values) = map.get("enum").and_then(Value::as_array) {
        return TypeDescriptor::Enum(values.clone());
    }
    if let Some(value) = map.get("const") {
        return TypeDescriptor::Const(value.clone());
    }

    match declared_type(map) {
        Some("array") => {
            let items = match map.get("items") {
                Some(items) if items.is_object() => map_with(items, mode),
                _ => TypeDescriptor::Opaque,
            };
            let items = if mode == Mode::Direct && !items.is_scalar() {
                TypeDescriptor::Opaque
            } else {
                items
            };
            return TypeDescriptor::ArrayOf(Box::new(items));
        }
        Some("string") => {
            return match map.get("format").and_then(Value::as_str) {
                Some("date-time") => TypeDescriptor::FormattedString(StringFormat::DateTime),
                _ => TypeDescriptor::Primitive(PrimitiveKind::String),
            };
        }
        Some(other) => {
            if let Some(kind) = PrimitiveKind::parse(other) {
                // An object built from branches keeps them
                if kind == PrimitiveKind::Object {
                    if let Some(composed) = variant_of(map, mode) {
                        return composed;
                    }
                }
                return TypeDescriptor::Primitive(kind);
            }
        }
        None => {}
    }

    variant_of(map, mode).unwrap_or(TypeDescriptor::Opaque)
}

/// First non-null entry of `type` (string or list form).
fn declared_type(map: &Map<String, Value>) -> Option<&str> {
    match map.get("type")? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

fn variant_of(map: &Map<String, Value>, mode: Mode) -> Option<TypeDescriptor> {
    for (keyword, tag) in [("oneOf", Composition::OneOf), ("anyOf", Composition::AnyOf)] {
        if let Some(branches) = map.get(keyword).and_then(Value::as_array) {
            return Some(variants(tag, branches, mode));
        }
    }

    let all_of = match mode {
        Mode::Resolved => map
            .get(COMPOSITION_KEY)
            .filter(|c| {
                c.get("kind").and_then(Value::as_str).and_then(Composition::parse)
                    == Some(Composition::AllOf)
            })
            .and_then(|c| c.get("branches")),
        Mode::Direct => map.get("allOf"),
    };
    all_of
        .and_then(Value::as_array)
        .map(|branches| variants(Composition::AllOf, branches, mode))
}

fn variants(tag: Composition, branches: &[Value], mode: Mode) -> TypeDescriptor {
    let variants = branches
        .iter()
        .map(|branch| Variant {
            descriptor: map_with(branch, mode),
            required: required_names(branch),
        })
        .collect();
    TypeDescriptor::VariantOf(tag, variants)
}

/// String entries of a schema's `required` list, in order.
pub fn required_names(schema: &Value) -> Vec<String> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
