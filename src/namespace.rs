//! Stable module names derived from the file-system layout of a schema corpus.
//!
//! A corpus is laid out as `schemas/[<version>/]<domain>/.../<name>.json`.
//! Module names are the path below the schema root with version-like
//! directories dropped, each segment camel-cased, joined with `.`:
//!
//! ```text
//! schemas_root/2026-01-11/shopping/types/buyer.json
//!   -> Example.Schemas.Shopping.Types.Buyer
//! ```

use std::path::{Path, PathBuf};

use crate::loader::absolute_path;
use crate::types::CompileOptions;

/// Directory name recognized as a schema root when no version directory exists.
const SCHEMAS_DIR: &str = "schemas";

/// Module naming for one resolution run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    prefix: String,
    root: Option<PathBuf>,
}

impl Namespace {
    /// Build a namespace with an explicit prefix and root.
    ///
    /// A relative root is taken against the working directory, matching how
    /// document paths are made absolute on load.
    pub fn new(prefix: impl Into<String>, root: Option<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            root: root.map(|root| absolute_path(&root)),
        }
    }

    /// Use the configured root if any, otherwise detect one from `origin`.
    pub fn detect(options: &CompileOptions, origin: &Path) -> Self {
        let root = options
            .schema_root
            .clone()
            .or_else(|| detect_schema_root(origin));
        Self::new(options.module_prefix.clone(), root)
    }

    /// Schema root used for relative names, if one was found.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Module name for the schema file at `file`.
    pub fn module_for(&self, file: &Path) -> String {
        let segments: Vec<String> = relative_segments(file, self.root())
            .iter()
            .map(|s| camel_segment(s))
            .filter(|s| !s.is_empty())
            .collect();

        let mut parts = Vec::with_capacity(segments.len() + 1);
        if !self.prefix.is_empty() {
            parts.push(self.prefix.clone());
        }
        parts.extend(segments);
        parts.join(".")
    }

    /// Module name for a definition inside `file`, addressed by `pointer`.
    ///
    /// The final pointer segment becomes an extra namespace segment.
    pub fn definition_module(&self, file: &Path, pointer: &str) -> String {
        let base = self.module_for(file);
        let last = pointer
            .trim_start_matches('#')
            .rsplit('/')
            .next()
            .map(|s| s.replace("~1", "/").replace("~0", "~"))
            .unwrap_or_default();
        let segment = camel_segment(&last);
        if segment.is_empty() {
            base
        } else {
            format!("{}.{}", base, segment)
        }
    }

    /// Flat output file name for a schema, e.g. `shopping_types_buyer.rs`.
    pub fn file_name_for(&self, file: &Path) -> String {
        let joined = relative_segments(file, self.root()).join("_");
        let mut name = String::with_capacity(joined.len());
        for c in joined.chars() {
            if c.is_ascii_alphanumeric() {
                name.push(c.to_ascii_lowercase());
            } else if !name.ends_with('_') {
                name.push('_');
            }
        }
        let name = name.trim_matches('_');
        let name = if name.is_empty() { "schema" } else { name };
        if name.starts_with(|c: char| c.is_ascii_digit()) {
            format!("m_{}.rs", name)
        } else {
            format!("{}.rs", name)
        }
    }
}

/// Find the schema root for a file.
///
/// The nearest enclosing version-like directory wins; otherwise the nearest
/// directory named `schemas`.
pub fn detect_schema_root(file: &Path) -> Option<PathBuf> {
    let dir = file.parent()?;
    if let Some(versioned) = dir
        .ancestors()
        .find(|a| a.file_name().and_then(|n| n.to_str()).is_some_and(is_version_segment))
    {
        return Some(versioned.to_path_buf());
    }
    dir.ancestors()
        .find(|a| a.file_name().and_then(|n| n.to_str()) == Some(SCHEMAS_DIR))
        .map(Path::to_path_buf)
}

/// Returns true for segments like `2026-01-11`, `2026-01`, `v1`, `v2.1`.
pub fn is_version_segment(segment: &str) -> bool {
    let parts: Vec<&str> = segment.split('-').collect();
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    let is_date = parts.len() >= 2
        && parts.len() <= 3
        && parts[0].len() == 4
        && parts.iter().all(|p| all_digits(p))
        && parts[1..].iter().all(|p| p.len() == 2);
    if is_date {
        return true;
    }

    segment
        .strip_prefix('v')
        .or_else(|| segment.strip_prefix('V'))
        .is_some_and(|rest| rest.split('.').all(all_digits))
}

/// Path segments (directories plus file stem) below the root.
///
/// Falls back to the file's immediate directory name plus its stem when the
/// file is not under the root.
fn relative_segments(file: &Path, root: Option<&Path>) -> Vec<String> {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let relative = root.and_then(|r| file.strip_prefix(r).ok());
    let mut segments: Vec<String> = match relative {
        Some(rel) => rel
            .parent()
            .map(|p| {
                p.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default(),
        None => file
            .parent()
            .and_then(Path::file_name)
            .map(|n| vec![n.to_string_lossy().into_owned()])
            .unwrap_or_default(),
    };
    segments.push(stem);
    segments.retain(|s| !s.is_empty() && !is_version_segment(s));
    segments
}

/// Replace punctuation with word breaks and capitalize each word.
fn camel_segment(segment: &str) -> String {
    segment
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
