//! Schema loading from disk.
//!
//! Reads schema files, decodes them, and checks the minimal structure the
//! rest of the pipeline relies on (the root must be a JSON object).

use std::path::{Component, Path, PathBuf};

use serde_json::Value;

use crate::error::LoadError;
use crate::types::{json_type_name, SchemaDocument, SchemaMetadata};

/// Where schema text comes from.
///
/// The resolver reads referenced files through this seam, so tests can
/// substitute an in-memory corpus and count reads.
pub trait SchemaSource {
    /// Returns true if `path` names a readable schema.
    fn exists(&self, path: &Path) -> bool;

    /// Read the raw bytes at `path`. Decoding is left to the loader, so
    /// undecodable content is reported as invalid JSON.
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// Reads schemas from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl SchemaSource for FsSource {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// Load a schema from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// `LoadError::InvalidJson` if the file isn't valid JSON, or
/// `LoadError::InvalidStructure` if the root isn't an object.
pub fn load_schema(path: &Path) -> Result<SchemaDocument, LoadError> {
    load_schema_from(&FsSource, path)
}

/// Load a schema through an arbitrary [`SchemaSource`].
pub fn load_schema_from<S: SchemaSource + ?Sized>(
    source: &S,
    path: &Path,
) -> Result<SchemaDocument, LoadError> {
    let path = absolute_path(path);
    if !source.exists(&path) {
        return Err(LoadError::FileNotFound { path });
    }

    let content = source.read(&path).map_err(|source| LoadError::ReadError {
        path: path.clone(),
        source,
    })?;

    decode(&content, path)
}

/// Decode schema text that was read from `path`.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` or `LoadError::InvalidStructure`.
pub fn load_schema_str(content: &str, path: impl Into<PathBuf>) -> Result<SchemaDocument, LoadError> {
    decode(content.as_bytes(), path.into())
}

fn decode(content: &[u8], path: PathBuf) -> Result<SchemaDocument, LoadError> {
    let root: Value = match serde_json::from_slice(content) {
        Ok(root) => root,
        Err(source) => return Err(LoadError::InvalidJson { path, source }),
    };

    if !root.is_object() {
        return Err(LoadError::InvalidStructure {
            actual: json_type_name(&root).to_string(),
            path,
        });
    }

    Ok(SchemaDocument::new(path, root))
}

/// Project the descriptive keys of a document.
pub fn metadata(document: &SchemaDocument) -> SchemaMetadata {
    let root = document.root();
    let text = |key: &str| root.get(key).and_then(Value::as_str).map(String::from);

    SchemaMetadata {
        id: text("$id"),
        schema_version: text("$schema"),
        title: text("title"),
        description: text("description"),
        declared_type: text("type"),
        required: root
            .get("required")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default(),
        has_definitions: root.get("$defs").is_some() || root.get("definitions").is_some(),
        has_all_of: root.get("allOf").is_some(),
        has_one_of: root.get("oneOf").is_some(),
        has_any_of: root.get("anyOf").is_some(),
    }
}

/// Returns true if the document has enough shape to produce a module.
///
/// Pure definition containers (only `$defs`) are not generatable.
pub fn is_generatable(document: &SchemaDocument) -> bool {
    let root = document.root();
    ["properties", "allOf", "oneOf", "anyOf"]
        .iter()
        .any(|key| root.get(key).is_some())
}

/// Navigate a JSON Pointer (e.g., "#/$defs/foo" or "/properties/bar").
///
/// Segments are unescaped per RFC 6901 (`~1` = `/`, `~0` = `~`).
/// Returns `None` if any segment is missing.
pub fn navigate_pointer<'a>(root: &'a Value, pointer: &str) -> Option<&'a Value> {
    let path = pointer.trim_start_matches('#');
    let path = path.strip_prefix('/').unwrap_or(path);
    if path.is_empty() {
        return Some(root);
    }

    let mut current = root;
    for part in path.split('/') {
        let key = part.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Object(map) => map.get(&key)?,
            Value::Array(arr) => arr.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Collect all .json files under a path (file or directory), sorted.
pub fn collect_schema_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if is_json(path) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if is_json(&path) {
            files.push(path);
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}

/// Make a path absolute and fold `.`/`..` segments lexically.
///
/// Does not touch the file system beyond reading the working directory,
/// so paths served by an in-memory [`SchemaSource`] normalize the same way.
pub fn absolute_path(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    normalize_path(&joined)
}

/// Fold `.` and `..` components without consulting the file system.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
