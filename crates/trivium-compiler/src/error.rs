//! Compilation errors

use crate::machine::Machine;
use std::path::PathBuf;
use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Unsupported construct for the {machine} machine: {construct}")]
    UnsupportedConstruct { construct: String, machine: Machine },

    #[error("{tool} failed ({status}): {detail}")]
    ExternalToolFailure {
        tool: String,
        status: String,
        detail: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal compiler error: {message}")]
    InternalError { message: String },
}

impl CompileError {
    pub(crate) fn undefined(name: &str) -> Self {
        CompileError::UndefinedVariable {
            name: name.to_string(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        CompileError::InternalError {
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.into(),
            source,
        }
    }
}
