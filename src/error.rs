use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum VmError {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config from {path}: {message}")]
    ConfigParse { path: String, message: String },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{message}")]
    #[diagnostic(code(vmctl::command_failed))]
    CommandFailed { code: i32, message: String },
}
