//! Reference and composition resolution.
//!
//! Produces an annotated copy of a schema tree:
//!
//! | Construct | Result |
//! |-----------|--------|
//! | `#/...` (local pointer) | Target inlined, site keys win, `_ref` + `_ref_definition` attached |
//! | `other.json[#/...]` (cross-file) | Site kept as a link, `_ref` + `_ref_module` attached |
//! | `allOf` | Branches deep-merged in order, `_composition` keeps the branches |
//! | `oneOf` / `anyOf` | Branches resolved independently, `_composition` attached |
//!
//! Cross-file references are never inlined; each file becomes its own module
//! and other modules link to it by name.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::{debug, trace};

use crate::error::ResolveError;
use crate::loader::{load_schema_from, navigate_pointer, normalize_path, FsSource, SchemaSource};
use crate::namespace::Namespace;
use crate::types::{
    CompileOptions, SchemaDocument, COMPOSITION_KEY, REF_DEFINITION_KEY, REF_KEY, REF_MODULE_KEY,
    SOURCE_KEY,
};

/// Cache key: absolute file path plus optional pointer into it.
pub type CacheKey = (PathBuf, Option<String>);

/// Per-run memo of externally loaded targets.
///
/// A `(path, None)` entry holds the whole decoded file, so different
/// pointers into the same file share one read.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<CacheKey, Value>,
    hits: usize,
    misses: usize,
}

impl ResolutionCache {
    /// Look up a target, counting the hit or miss.
    pub fn get(&mut self, key: &CacheKey) -> Option<&Value> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits += 1;
                Some(value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: CacheKey, value: Value) {
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

/// State threaded through one top-level [`Resolver::resolve`] call.
///
/// Cross-file targets are linked rather than walked, so the file being
/// walked is always the file the run started from.
#[derive(Debug)]
struct ResolutionContext<'a> {
    /// File whose directory relative references are resolved against.
    current_file: PathBuf,
    namespace: Namespace,
    cache: ResolutionCache,
    /// Root of the file being walked, for local pointers.
    root: &'a Value,
    /// `(file, pointer)` targets currently being resolved.
    in_flight: HashSet<(PathBuf, String)>,
}

impl<'a> ResolutionContext<'a> {
    fn new(document: &'a SchemaDocument, options: &CompileOptions) -> Self {
        Self {
            current_file: document.path().to_path_buf(),
            namespace: Namespace::detect(options, document.path()),
            cache: ResolutionCache::default(),
            root: document.root(),
            in_flight: HashSet::new(),
        }
    }

    fn current_dir(&self) -> &Path {
        self.current_file.parent().unwrap_or(Path::new("/"))
    }
}

/// Resolves references and compositions for one schema at a time.
#[derive(Debug, Clone)]
pub struct Resolver<S = FsSource> {
    source: S,
    options: CompileOptions,
}

impl Resolver<FsSource> {
    /// Resolver reading referenced files from disk.
    pub fn new(options: CompileOptions) -> Self {
        Self::with_source(FsSource, options)
    }
}

impl<S: SchemaSource> Resolver<S> {
    /// Resolver reading referenced files through `source`.
    pub fn with_source(source: S, options: CompileOptions) -> Self {
        Self { source, options }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Resolve a loaded document.
    ///
    /// The returned tree carries `_source` at its root. A fresh cache is
    /// used for every call.
    ///
    /// # Errors
    ///
    /// `RefNotFound` if a pointer doesn't resolve inside its target,
    /// `FileError` if a referenced file can't be loaded, and
    /// `CircularReference` if a local reference re-enters a target that is
    /// still being resolved.
    pub fn resolve(&self, document: &SchemaDocument) -> Result<Value, ResolveError> {
        let mut ctx = ResolutionContext::new(document, &self.options);
        ctx.in_flight
            .insert((ctx.current_file.clone(), String::new()));

        let mut resolved = self.resolve_value(document.root(), &mut ctx)?;
        if let Value::Object(map) = &mut resolved {
            map.insert(
                SOURCE_KEY.to_string(),
                Value::String(document.path().display().to_string()),
            );
        }

        debug!(
            file = %document.path().display(),
            cached = ctx.cache.len(),
            hits = ctx.cache.hits(),
            misses = ctx.cache.misses(),
            "resolved schema"
        );
        Ok(resolved)
    }

    /// Load `path` from the resolver's source and resolve it.
    pub fn resolve_path(&self, path: &Path) -> Result<Value, ResolveError> {
        let document =
            load_schema_from(&self.source, path).map_err(|source| ResolveError::FileError {
                reference: path.display().to_string(),
                source,
            })?;
        self.resolve(&document)
    }

    fn resolve_value(
        &self,
        value: &Value,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Value, ResolveError> {
        match value {
            Value::Object(map) => self.resolve_object(map, ctx),
            other => Ok(other.clone()),
        }
    }

    fn resolve_object(
        &self,
        map: &Map<String, Value>,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Value, ResolveError> {
        if let Some(Value::String(reference)) = map.get("$ref") {
            return self.resolve_ref(reference, map, ctx);
        }

        let mut result = Map::new();
        let mut alternatives: Option<(&str, Vec<Value>)> = None;

        for (key, value) in map {
            match key.as_str() {
                "properties" => {
                    let resolved = match value.as_object() {
                        Some(props) => {
                            let mut out = Map::new();
                            for (name, prop) in props {
                                out.insert(name.clone(), self.resolve_value(prop, ctx)?);
                            }
                            Value::Object(out)
                        }
                        None => value.clone(),
                    };
                    result.insert(key.clone(), resolved);
                }
                "items" => {
                    let resolved = match value {
                        Value::Array(items) => Value::Array(self.resolve_branches(items, ctx)?),
                        other => self.resolve_value(other, ctx)?,
                    };
                    result.insert(key.clone(), resolved);
                }
                "oneOf" | "anyOf" => {
                    let Some(arr) = value.as_array() else {
                        result.insert(key.clone(), value.clone());
                        continue;
                    };
                    let branches = self.resolve_branches(arr, ctx)?;
                    result.insert(key.clone(), Value::Array(branches.clone()));
                    // oneOf takes precedence if a schema declares both
                    if alternatives.is_none() || key == "oneOf" {
                        let kind = if key == "oneOf" { "one_of" } else { "any_of" };
                        alternatives = Some((kind, branches));
                    }
                }
                // Merged below, once the site's own keys are resolved
                "allOf" if value.is_array() => {}
                _ => {
                    result.insert(key.clone(), value.clone());
                }
            }
        }

        if let Some((kind, branches)) = alternatives {
            result.insert(COMPOSITION_KEY.to_string(), composition(kind, branches));
        }

        match map.get("allOf").and_then(Value::as_array) {
            Some(arr) => self.merge_all_of(arr, result, ctx),
            None => Ok(Value::Object(result)),
        }
    }

    fn resolve_branches(
        &self,
        branches: &[Value],
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Vec<Value>, ResolveError> {
        branches
            .iter()
            .map(|branch| self.resolve_value(branch, ctx))
            .collect()
    }

    /// Deep-merge resolved `allOf` branches in order, then the site on top.
    fn merge_all_of(
        &self,
        branches: &[Value],
        site: Map<String, Value>,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Value, ResolveError> {
        let resolved = self.resolve_branches(branches, ctx)?;
        let merged = resolved
            .iter()
            .cloned()
            .fold(Value::Object(Map::new()), deep_merge);
        let mut merged = deep_merge(merged, Value::Object(site));

        if let Value::Object(map) = &mut merged {
            map.insert(
                COMPOSITION_KEY.to_string(),
                composition("all_of", resolved),
            );
        }
        Ok(merged)
    }

    fn resolve_ref(
        &self,
        reference: &str,
        site: &Map<String, Value>,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Value, ResolveError> {
        let (file_part, pointer) = match reference.find('#') {
            Some(idx) => (&reference[..idx], Some(&reference[idx + 1..])),
            None => (reference, None),
        };

        if file_part.is_empty() {
            self.resolve_local(reference, pointer.unwrap_or(""), site, ctx)
        } else {
            self.resolve_external(reference, file_part, pointer, site, ctx)
        }
    }

    /// Inline a `#/...` target from the current file's root.
    fn resolve_local(
        &self,
        reference: &str,
        pointer: &str,
        site: &Map<String, Value>,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Value, ResolveError> {
        trace!(reference, file = %ctx.current_file.display(), "local reference");

        let key = (ctx.current_file.clone(), pointer.to_string());
        if ctx.in_flight.contains(&key) {
            return Err(ResolveError::CircularReference {
                reference: reference.to_string(),
                file: ctx.current_file.clone(),
            });
        }

        let root = ctx.root;
        let target = navigate_pointer(root, pointer).ok_or_else(|| ResolveError::RefNotFound {
            reference: reference.to_string(),
            file: ctx.current_file.clone(),
        })?;

        ctx.in_flight.insert(key.clone());
        let resolved = self.resolve_value(target, ctx);
        ctx.in_flight.remove(&key);
        let resolved = resolved?;

        let mut rest = site.clone();
        rest.remove("$ref");
        let overlay = if rest.is_empty() {
            Map::new()
        } else {
            match self.resolve_object(&rest, ctx)? {
                Value::Object(map) => map,
                _ => Map::new(),
            }
        };

        let mut result = match resolved {
            Value::Object(map) => map,
            other => {
                // Pointer into a non-schema value; keep it visible
                let mut map = Map::new();
                map.insert("const".to_string(), other);
                map
            }
        };
        for (k, v) in overlay {
            result.insert(k, v);
        }
        result.insert(REF_KEY.to_string(), Value::String(reference.to_string()));
        result.insert(
            REF_DEFINITION_KEY.to_string(),
            Value::String(ctx.namespace.definition_module(&ctx.current_file, pointer)),
        );
        Ok(Value::Object(result))
    }

    /// Annotate a cross-file reference with its target module, without inlining.
    fn resolve_external(
        &self,
        reference: &str,
        file_part: &str,
        pointer: Option<&str>,
        site: &Map<String, Value>,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<Value, ResolveError> {
        let path = normalize_path(&ctx.current_dir().join(file_part));
        let pointer = pointer.filter(|p| !p.is_empty() && *p != "/");

        self.load_target(reference, &path, pointer, ctx)?;

        let module = match pointer {
            Some(p) => ctx.namespace.definition_module(&path, p),
            None => ctx.namespace.module_for(&path),
        };
        debug!(reference, module = %module, "cross-file reference");

        let mut result = site.clone();
        result.insert(REF_KEY.to_string(), Value::String(reference.to_string()));
        result.insert(REF_MODULE_KEY.to_string(), Value::String(module));
        Ok(Value::Object(result))
    }

    /// Make sure `(path, pointer)` exists, reading each file at most once per run.
    fn load_target(
        &self,
        reference: &str,
        path: &Path,
        pointer: Option<&str>,
        ctx: &mut ResolutionContext<'_>,
    ) -> Result<(), ResolveError> {
        let key: CacheKey = (path.to_path_buf(), pointer.map(String::from));
        if ctx.cache.get(&key).is_some() {
            debug!(reference, "cache hit");
            return Ok(());
        }

        let file_key: CacheKey = (path.to_path_buf(), None);
        let document = match ctx.cache.get(&file_key) {
            Some(doc) => doc.clone(),
            None => {
                debug!(path = %path.display(), "loading referenced file");
                let loaded = load_schema_from(&self.source, path).map_err(|source| {
                    ResolveError::FileError {
                        reference: reference.to_string(),
                        source,
                    }
                })?;
                let root = loaded.root().clone();
                ctx.cache.insert(file_key, root.clone());
                root
            }
        };

        if let Some(p) = pointer {
            let target =
                navigate_pointer(&document, p).ok_or_else(|| ResolveError::RefNotFound {
                    reference: reference.to_string(),
                    file: path.to_path_buf(),
                })?;
            ctx.cache.insert(key, target.clone());
        }
        Ok(())
    }
}

/// Merge `overlay` into `base`: maps key by key, lists concatenated,
/// anything else replaced by the overlay.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => {
                        let existing = std::mem::take(slot);
                        *slot = deep_merge(existing, value);
                    }
                    None => {
                        base.insert(key, value);
                    }
                }
            }
            Value::Object(base)
        }
        (Value::Array(mut base), Value::Array(overlay)) => {
            base.extend(overlay);
            Value::Array(base)
        }
        (_, overlay) => overlay,
    }
}

fn composition(kind: &str, branches: Vec<Value>) -> Value {
    json!({ "kind": kind, "branches": branches })
}
