//! Error types for schema loading, resolution, and code generation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while reading and decoding a schema file.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid schema structure in {path}: expected object, got {actual}")]
    InvalidStructure { path: PathBuf, actual: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors while resolving `$ref` and composition keywords.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("reference not found: {reference} (in {file})")]
    RefNotFound { reference: String, file: PathBuf },

    #[error("cannot load {reference}: {source}")]
    FileError {
        reference: String,
        #[source]
        source: LoadError,
    },

    #[error("circular reference detected: {reference} (in {file})")]
    CircularReference { reference: String, file: PathBuf },
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::FileError { source, .. } => source.exit_code(),
            _ => 2,
        }
    }
}

/// Errors while producing module source.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("cannot generate module: {message}")]
    Unsupported { message: String },

    #[error("{path} has no properties or compositions to generate from")]
    NotGeneratable { path: PathBuf },

    #[error("refusing to clear {path}: it contains the schema root")]
    UnsafeOutputDir { path: PathBuf },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenerateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            GenerateError::Write { .. } => 3,
            _ => 2,
        }
    }
}

/// Any failure compiling one schema file.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Generate(#[from] GenerateError),
}

impl CompileError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileError::Load(e) => e.exit_code(),
            CompileError::Resolve(e) => e.exit_code(),
            CompileError::Generate(e) => e.exit_code(),
        }
    }
}
