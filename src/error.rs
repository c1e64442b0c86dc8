//! Error types.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::annotation::AnnotationId;

/// Fatal rendering errors. Rendering is deterministic, so retrying the
/// same input fails the same way.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unit {unit}: cannot close {kind} annotation {id}, it is not open")]
    StackConsistency {
        id: AnnotationId,
        kind: String,
        unit: usize,
    },

    #[error("unit {unit}: {kind} annotation {id} reappears after it was closed")]
    Reopened {
        id: AnnotationId,
        kind: String,
        unit: usize,
    },

    #[error("unit {unit}: {kind} annotation {id} is listed more than once")]
    Duplicate {
        id: AnnotationId,
        kind: String,
        unit: usize,
    },

    #[error("write error: {0}")]
    Fmt(#[from] fmt::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("escape key {0:?} must be exactly one character")]
    EscapeKey(String),

    #[error("unknown preset: {0}")]
    UnknownPreset(String),
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("annotation {index}: range {start}..{end} is outside 0..{len}")]
    Range {
        index: usize,
        start: usize,
        end: usize,
        len: usize,
    },
}

/// Any failure of the end-to-end conversions in the crate root.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Document(#[from] DocumentError),
}
