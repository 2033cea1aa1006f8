//! Rendering a [`ModuleSpec`] as Rust source.
//!
//! Every emitted module depends only on `serde_json`. It carries the
//! hoisted constants, a static field table and a record type whose
//! constructor enforces `required`, `enum`/`const` and primitive shapes.

use std::collections::HashSet;

use serde_json::Value;

use crate::module_spec::{snake_case, DeclarationKind, ModuleSpec};
use crate::type_mapper::{symbol, Composition, PrimitiveKind, StringFormat, TypeDescriptor};

/// Indentation-aware string builder for Rust source.
pub struct CodeWriter {
    buf: String,
    depth: usize,
}

impl Default for CodeWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeWriter {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            depth: 0,
        }
    }

    /// Write a line at the current indentation level.
    pub fn line(&mut self, text: &str) {
        if text.is_empty() {
            self.buf.push('\n');
            return;
        }
        self.write_indent();
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    /// Open a block: write `text {` and increase indent.
    pub fn open(&mut self, text: &str) {
        self.write_indent();
        self.buf.push_str(text);
        self.buf.push_str(" {\n");
        self.depth += 1;
    }

    /// Close a block with `suffix` after the brace, e.g. `;` or `,`.
    pub fn close_with(&mut self, suffix: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.write_indent();
        self.buf.push('}');
        self.buf.push_str(suffix);
        self.buf.push('\n');
    }

    pub fn close(&mut self) {
        self.close_with("");
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Append pre-formatted text verbatim.
    pub fn raw(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    /// Consume and return the built string.
    pub fn finish(self) -> String {
        self.buf
    }

    fn write_indent(&mut self) {
        for _ in 0..self.depth {
            self.buf.push_str("    ");
        }
    }
}

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in", "let",
    "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return",
    "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use",
    "virtual", "where", "while", "yield",
];

/// Keywords that cannot be written as raw identifiers.
const UNRAWABLE: &[&str] = &["self", "Self", "super", "crate"];

/// Type names the generated module defines or relies on.
const RESERVED_TYPES: &[&str] = &[
    "Branch", "Box", "Default", "Err", "Field", "FieldError", "Kind", "Map", "None", "Ok",
    "Option", "Result", "Self", "Some", "String", "Value", "Vec",
];

/// Make `name` usable as a Rust value identifier.
pub fn field_ident(name: &str) -> String {
    let mut ident = snake_case(name);
    if ident.is_empty() {
        ident.push_str("field");
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if UNRAWABLE.contains(&ident.as_str()) {
        ident.push('_');
    } else if KEYWORDS.contains(&ident.as_str()) {
        ident.insert_str(0, "r#");
    }
    ident
}

/// Struct name for the module's record type.
pub fn record_ident(spec: &ModuleSpec) -> String {
    let mut name: String = spec
        .record_name()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "Record");
    } else if RESERVED_TYPES.contains(&name.as_str()) || KEYWORDS.contains(&name.as_str()) {
        name.push_str("Record");
    }
    name
}

/// Render one module.
pub fn render(spec: &ModuleSpec) -> String {
    let mut w = CodeWriter::new();
    header(&mut w, spec);

    w.line("use serde_json::{Map, Value};");
    w.blank();
    w.line(&format!("pub const MODULE: &str = {:?};", spec.module_name));
    w.blank();

    if !spec.enum_declarations.is_empty() {
        for decl in &spec.enum_declarations {
            let symbols = literal_texts(&decl.symbols);
            match decl.kind {
                DeclarationKind::Enum => w.line(&format!(
                    "pub const {}: &[&str] = &[{}];",
                    decl.name,
                    str_list(&symbols)
                )),
                DeclarationKind::Const => w.line(&format!(
                    "pub const {}: &str = {:?};",
                    decl.name,
                    symbols.first().map(String::as_str).unwrap_or_default()
                )),
            }
        }
        w.blank();
    }

    w.raw(DESCRIPTOR_TYPES);
    w.blank();
    field_table(&mut w, spec);
    w.blank();
    w.raw(RUNTIME);
    w.blank();
    record(&mut w, spec);
    w.finish()
}

/// Render the `mod.rs` index for a batch output directory.
pub fn render_mod_index(file_stems: &[String]) -> String {
    let mut stems: Vec<&String> = file_stems.iter().collect();
    stems.sort();
    stems.dedup();

    let mut w = CodeWriter::new();
    w.line("//! Generated schema modules. Do not edit by hand; regenerate with `ucp-codegen`.");
    w.blank();
    for stem in stems {
        if UNRAWABLE.contains(&stem.as_str()) {
            w.line(&format!("#[path = \"{}.rs\"]", stem));
            w.line(&format!("pub mod {}_;", stem));
        } else if KEYWORDS.contains(&stem.as_str()) {
            w.line(&format!("pub mod r#{};", stem));
        } else {
            w.line(&format!("pub mod {};", stem));
        }
    }
    w.finish()
}

fn header(w: &mut CodeWriter, spec: &ModuleSpec) {
    let mut wrote = false;
    for text in [&spec.doc_title, &spec.doc_description].into_iter().flatten() {
        if wrote {
            w.line("//!");
        }
        for line in text.lines() {
            doc_line(w, "//!", line);
        }
        wrote = true;
    }
    if wrote {
        w.line("//!");
    }
    w.line(&format!(
        "//! Generated from `{}` as `{}`.",
        spec.source_file_basename, spec.module_name
    ));
    w.line("//! Do not edit by hand; regenerate with `ucp-codegen`.");
    w.blank();
}

fn doc_line(w: &mut CodeWriter, marker: &str, text: &str) {
    let text = text.trim_end();
    if text.is_empty() {
        w.line(marker);
    } else {
        w.line(&format!("{} {}", marker, text));
    }
}

fn field_table(w: &mut CodeWriter, spec: &ModuleSpec) {
    w.line("pub const FIELDS: &[Field] = &[");
    w.indent();
    for field in &spec.fields {
        w.open("Field");
        w.line(&format!("name: {:?},", field.name));
        w.line(&format!("kind: {},", kind_expr(spec, &field.ty)));
        w.line(&format!("required: {},", field.required));
        w.line(&format!("description: {},", option_str(field.description.as_deref())));
        let default = field.default.as_ref().map(|v| v.to_string());
        w.line(&format!("default: {},", option_str(default.as_deref())));
        w.close_with(",");
    }
    w.dedent();
    w.line("];");
    w.blank();
    w.line(&format!(
        "pub const REQUIRED: &[&str] = &[{}];",
        str_list(&spec.required_fields)
    ));
    w.blank();
    w.line("/// Field table, sorted by name.");
    w.open("pub fn fields() -> &'static [Field]");
    w.line("FIELDS");
    w.close();
}

fn record(w: &mut CodeWriter, spec: &ModuleSpec) {
    let name = record_ident(spec);
    let mut seen = HashSet::new();
    let members: Vec<(String, &str, &str, bool, Option<&str>)> = spec
        .fields
        .iter()
        .map(|field| {
            let mut ident = field_ident(&field.name);
            let base = ident.clone();
            let mut n = 2;
            while !seen.insert(ident.clone()) {
                ident = format!("{}_{}", base, n);
                n += 1;
            }
            let (ty, accessor) = extraction(&field.ty);
            (
                ident,
                ty,
                accessor,
                field.required,
                field.description.as_deref(),
            )
        })
        .collect();

    match &spec.doc_title {
        Some(title) => {
            for line in title.lines() {
                doc_line(w, "///", line);
            }
        }
        None => w.line(&format!("/// Validated `{}` record.", spec.module_name)),
    }
    w.line("#[derive(Debug, Clone, PartialEq)]");
    w.open(&format!("pub struct {}", name));
    for (ident, ty, _, required, description) in &members {
        if let Some(description) = description {
            for line in description.lines() {
                doc_line(w, "///", line);
            }
        }
        if *required {
            w.line(&format!("pub {}: {},", ident, ty));
        } else {
            w.line(&format!("pub {}: Option<{}>,", ident, ty));
        }
    }
    w.close();
    w.blank();

    w.open(&format!("impl {}", name));
    w.line("/// Apply defaults, validate every field and extract the typed record.");
    w.line("///");
    w.line("/// All violations are reported, not just the first.");
    w.open("pub fn new(input: &Value) -> Result<Self, Vec<FieldError>>");
    w.open("let object = match input.as_object()");
    w.line("Some(object) => object,");
    w.line("None => return Err(vec![FieldError::NotAnObject]),");
    w.close_with(";");
    w.line("let record = with_defaults(object);");
    w.line("let errors = check(&record);");
    w.open("if !errors.is_empty()");
    w.line("return Err(errors);");
    w.close();
    if members.is_empty() {
        w.line("let _ = record;");
    }
    w.open("Ok(Self");
    for ((ident, _, accessor, required, _), field) in members.iter().zip(&spec.fields) {
        let unwrap = if *required { ".unwrap_or_default()" } else { "" };
        w.line(&format!(
            "{}: record.get({:?}){}{},",
            ident, field.name, accessor, unwrap
        ));
    }
    w.close_with(")");
    w.close();
    w.close();
}

/// Stored Rust type and the accessor chain applied to `Option<&Value>`.
fn extraction(ty: &TypeDescriptor) -> (&'static str, &'static str) {
    match ty {
        TypeDescriptor::Primitive(PrimitiveKind::String) | TypeDescriptor::FormattedString(_) => {
            ("String", ".and_then(Value::as_str).map(String::from)")
        }
        TypeDescriptor::Enum(_) | TypeDescriptor::Const(_) => ("String", ".map(symbol)"),
        TypeDescriptor::Primitive(PrimitiveKind::Integer) => ("i64", ".and_then(Value::as_i64)"),
        TypeDescriptor::Primitive(PrimitiveKind::Number) => ("f64", ".and_then(Value::as_f64)"),
        TypeDescriptor::Primitive(PrimitiveKind::Boolean) => ("bool", ".and_then(Value::as_bool)"),
        TypeDescriptor::ArrayOf(_) => ("Vec<Value>", ".and_then(Value::as_array).cloned()"),
        TypeDescriptor::Primitive(PrimitiveKind::Object)
        | TypeDescriptor::Reference(_)
        | TypeDescriptor::VariantOf(..)
        | TypeDescriptor::Opaque => ("Value", ".cloned()"),
    }
}

fn kind_expr(spec: &ModuleSpec, ty: &TypeDescriptor) -> String {
    match ty {
        TypeDescriptor::Primitive(kind) => match kind {
            PrimitiveKind::String => "Kind::String",
            PrimitiveKind::Integer => "Kind::Integer",
            PrimitiveKind::Number => "Kind::Number",
            PrimitiveKind::Boolean => "Kind::Boolean",
            PrimitiveKind::Object => "Kind::Object",
        }
        .to_string(),
        TypeDescriptor::FormattedString(StringFormat::DateTime) => "Kind::Timestamp".to_string(),
        TypeDescriptor::Enum(symbols) => {
            let variant = if all_strings(symbols) { "Enum" } else { "JsonEnum" };
            match spec.declaration(DeclarationKind::Enum, symbols) {
                Some(decl) => format!("Kind::{}({})", variant, decl.name),
                None => format!("Kind::{}(&[{}])", variant, str_list(&literal_texts(symbols))),
            }
        }
        TypeDescriptor::Const(value) => {
            let symbols = std::slice::from_ref(value);
            let variant = if all_strings(symbols) { "Const" } else { "JsonConst" };
            match spec.declaration(DeclarationKind::Const, symbols) {
                Some(decl) => format!("Kind::{}({})", variant, decl.name),
                None => format!("Kind::{}({:?})", variant, literal_texts(symbols).concat()),
            }
        }
        TypeDescriptor::ArrayOf(items) => format!("Kind::Array(&{})", kind_expr(spec, items)),
        TypeDescriptor::Reference(module) => format!("Kind::Reference({:?})", module),
        TypeDescriptor::VariantOf(tag, variants) => {
            let branches: Vec<String> = variants
                .iter()
                .map(|v| {
                    format!(
                        "Branch {{ kind: {}, required: &[{}] }}",
                        kind_expr(spec, &v.descriptor),
                        str_list(&v.required)
                    )
                })
                .collect();
            let variant = match tag {
                Composition::AllOf => "AllOf",
                Composition::OneOf | Composition::AnyOf => "Variant",
            };
            format!("Kind::{}(&[{}])", variant, branches.join(", "))
        }
        TypeDescriptor::Opaque => "Kind::Any".to_string(),
    }
}

fn all_strings(symbols: &[Value]) -> bool {
    symbols.iter().all(Value::is_string)
}

/// Emitted form of a symbol set: plain strings when every symbol is a
/// string, otherwise the JSON text of each value.
fn literal_texts(symbols: &[Value]) -> Vec<String> {
    if all_strings(symbols) {
        symbols.iter().map(symbol).collect()
    } else {
        symbols.iter().map(Value::to_string).collect()
    }
}

fn str_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("{:?}", s))
        .collect::<Vec<_>>()
        .join(", ")
}

fn option_str(value: Option<&str>) -> String {
    match value {
        Some(s) => format!("Some({:?})", s),
        None => "None".to_string(),
    }
}

const DESCRIPTOR_TYPES: &str = r#"/// Stored shape of a field.
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
"#;

const RUNTIME: &str = r#"#[derive(Debug, Clone, PartialEq, Eq)]
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
"#;
