//! Checkout
//!
//! A shopping session.
//!
//! Generated from `checkout.json` as `Ucp.Schemas.Shopping.Checkout`.
//! Do not edit by hand; regenerate with `ucp-codegen`.

use serde_json::{Map, Value};

pub const MODULE: &str = "Ucp.Schemas.Shopping.Checkout";

pub const STATUS_VALUES: &[&str] = &["incomplete", "ready_for_complete", "completed"];

/// Stored shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    String,
    /// RFC 3339 `date-time` string.
    Timestamp,
    Integer,
    Number,
    Boolean,
    Object,
    /// Any JSON value.
    Any,
    Enum(&'static [&'static str]),
    Const(&'static str),
    /// Closed set holding non-string values, each as JSON text.
    JsonEnum(&'static [&'static str]),
    /// Non-string constant as JSON text.
    JsonConst(&'static str),
    Array(&'static Kind),
    /// Object described by another generated module.
    Reference(&'static str),
    /// `oneOf`/`anyOf`: exactly one branch is selected.
    Variant(&'static [Branch]),
    /// `allOf`: every branch must hold at once.
    AllOf(&'static [Branch]),
}

/// One branch of a [`Kind::Variant`] or [`Kind::AllOf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Branch {
    pub kind: Kind,
    pub required: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
    pub required: bool,
    pub description: Option<&'static str>,
    /// Declared default as JSON text.
    pub default: Option<&'static str>,
}

pub const FIELDS: &[Field] = &[
    Field {
        name: "currency",
        kind: Kind::String,
        required: true,
        description: Some("ISO 4217 code."),
        default: None,
    },
    Field {
        name: "line_items",
        kind: Kind::Array(&Kind::Reference("Ucp.Schemas.Shopping.Types.LineItem")),
        required: true,
        description: None,
        default: None,
    },
    Field {
        name: "quantity",
        kind: Kind::Integer,
        required: false,
        description: None,
        default: Some("1"),
    },
    Field {
        name: "status",
        kind: Kind::Enum(STATUS_VALUES),
        required: false,
        description: None,
        default: None,
    },
];

pub const REQUIRED: &[&str] = &["currency", "line_items"];

/// Field table, sorted by name.
pub fn fields() -> &'static [Field] {
    FIELDS
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    NotAnObject,
    Missing(&'static str),
    Invalid {
        field: &'static str,
        expected: &'static str,
    },
    UnknownVariant {
        field: &'static str,
    },
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldError::NotAnObject => write!(f, "expected a JSON object"),
            FieldError::Missing(field) => write!(f, "missing required field `{}`", field),
            FieldError::Invalid { field, expected } => {
                write!(f, "field `{}` must be {}", field, expected)
            }
            FieldError::UnknownVariant { field } => {
                write!(f, "field `{}` matches no declared variant", field)
            }
        }
    }
}

impl std::error::Error for FieldError {}

/// Index of the branch `value` matches.
///
/// A branch matches when its shape conforms and every field it requires is
/// present and non-null. The branch with the most required fields wins;
/// ties go to the earliest.
pub fn select_branch(branches: &[Branch], value: &Value) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (index, branch) in branches.iter().enumerate() {
        if !holds(branch, value) {
            continue;
        }
        let score = branch.required.len();
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((index, score));
        }
    }
    best.map(|(index, _)| index)
}

fn holds(branch: &Branch, value: &Value) -> bool {
    conforms(&branch.kind, value)
        && branch
            .required
            .iter()
            .all(|name| value.get(*name).map_or(false, |v| !v.is_null()))
}

fn describe(kind: &Kind) -> &'static str {
    match kind {
        Kind::String => "a string",
        Kind::Timestamp => "an RFC 3339 timestamp",
        Kind::Integer => "an integer",
        Kind::Number => "a number",
        Kind::Boolean => "a boolean",
        Kind::Object | Kind::Reference(_) => "an object",
        Kind::Any => "any value",
        Kind::Enum(_) | Kind::JsonEnum(_) => "one of the declared values",
        Kind::Const(_) | Kind::JsonConst(_) => "the declared constant",
        Kind::Array(_) => "an array of conforming items",
        Kind::Variant(_) => "one of the declared variants",
        Kind::AllOf(_) => "an object satisfying every declared branch",
    }
}

fn symbol(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_timestamp(s: &str) -> bool {
    let b = s.as_bytes();
    let digits = |range: std::ops::Range<usize>| b[range].iter().all(u8::is_ascii_digit);
    b.len() >= 20
        && digits(0..4)
        && b[4] == b'-'
        && digits(5..7)
        && b[7] == b'-'
        && digits(8..10)
        && matches!(b[10], b'T' | b't')
        && digits(11..13)
        && b[13] == b':'
        && digits(14..16)
        && b[16] == b':'
        && digits(17..19)
        && matches!(b[b.len() - 1], b'Z' | b'z' | b'0'..=b'9')
}

/// Equality against a JSON-text literal. Numbers compare by value, so
/// `1` and `1.0` are the same.
fn same_value(text: &str, value: &Value) -> bool {
    match serde_json::from_str::<Value>(text) {
        Ok(expected) if expected.is_number() && value.is_number() => {
            expected.as_f64() == value.as_f64()
        }
        Ok(expected) => expected == *value,
        Err(_) => false,
    }
}

/// Whether `value` has the shape `kind` describes.
pub fn conforms(kind: &Kind, value: &Value) -> bool {
    match kind {
        Kind::String => value.is_string(),
        Kind::Timestamp => value.as_str().map_or(false, is_timestamp),
        Kind::Integer => value.is_i64(),
        Kind::Number => value.is_number(),
        Kind::Boolean => value.is_boolean(),
        Kind::Object | Kind::Reference(_) => value.is_object(),
        Kind::Any => true,
        Kind::Enum(symbols) => value.as_str().map_or(false, |s| symbols.contains(&s)),
        Kind::Const(expected) => value.as_str() == Some(*expected),
        Kind::JsonEnum(texts) => texts.iter().any(|text| same_value(text, value)),
        Kind::JsonConst(text) => same_value(text, value),
        Kind::Array(items) => value
            .as_array()
            .map_or(false, |values| values.iter().all(|v| conforms(items, v))),
        Kind::Variant(branches) => select_branch(branches, value).is_some(),
        Kind::AllOf(branches) => branches.iter().all(|branch| holds(branch, value)),
    }
}

/// Copy of `input` with nulls dropped and declared defaults filled in.
fn with_defaults(input: &Map<String, Value>) -> Map<String, Value> {
    let mut record: Map<String, Value> = input
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    for field in FIELDS {
        if record.contains_key(field.name) {
            continue;
        }
        if let Some(value) = field.default.and_then(|d| serde_json::from_str::<Value>(d).ok()) {
            if !value.is_null() {
                record.insert(field.name.to_string(), value);
            }
        }
    }
    record
}

fn check(record: &Map<String, Value>) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for name in REQUIRED {
        if !record.contains_key(*name) {
            errors.push(FieldError::Missing(*name));
        }
    }
    for field in FIELDS {
        let value = match record.get(field.name) {
            Some(value) => value,
            None => continue,
        };
        match field.kind {
            Kind::Variant(branches) => {
                if select_branch(branches, value).is_none() {
                    errors.push(FieldError::UnknownVariant { field: field.name });
                }
            }
            kind => {
                if !conforms(&kind, value) {
                    errors.push(FieldError::Invalid {
                        field: field.name,
                        expected: describe(&kind),
                    });
                }
            }
        }
    }
    errors
}

/// Checkout
#[derive(Debug, Clone, PartialEq)]
pub struct Checkout {
    /// ISO 4217 code.
    pub currency: String,
    pub line_items: Vec<Value>,
    pub quantity: Option<i64>,
    pub status: Option<String>,
}

impl Checkout {
    /// Apply defaults, validate every field and extract the typed record.
    ///
    /// All violations are reported, not just the first.
    pub fn new(input: &Value) -> Result<Self, Vec<FieldError>> {
        let object = match input.as_object() {
            Some(object) => object,
            None => return Err(vec![FieldError::NotAnObject]),
        };
        let record = with_defaults(object);
        let errors = check(&record);
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Self {
            currency: record.get("currency").and_then(Value::as_str).map(String::from).unwrap_or_default(),
            line_items: record.get("line_items").and_then(Value::as_array).cloned().unwrap_or_default(),
            quantity: record.get("quantity").and_then(Value::as_i64),
            status: record.get("status").map(symbol),
        })
    }
}
