//! Error types shared across the pipeline.
//!
//! Per-variant and oracle-inconclusive failures never reach this type: they
//! are caught and logged at the worker boundary (see `phase1`/`phase3`).
//! `NccatError` covers the recoverable faults a phase driver can hit -- I/O,
//! malformed JSON, and a misbehaving compiler-under-test invocation.
//! Structural invariant violations (e.g. an unwalked AST) are deliberately
//! left as `panic!`/`assert!` -- they indicate a bug in this crate, not bad
//! input.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NccatError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse C source: {0}")]
    Parse(String),

    #[error("mutation failed: {0}")]
    Mutation(String),

    #[error("compiler invocation failed: {0}")]
    Oracle(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl NccatError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NccatError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        NccatError::Json {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, NccatError>;
