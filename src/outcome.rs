//! Success/failure envelope shared by every VM operation.
//!
//! An `Outcome` carries an application status code (`0` means success), a
//! diagnostic message, and an optional payload. Expected failures (a missing
//! lease file, an ambiguous bundle, a nonzero exit from the control command)
//! travel in an `Outcome`; truly unexpected conditions are a
//! [`VmError`](crate::error::VmError) instead.

use std::fmt;

use crate::process::CommandOutput;

/// Code used for failures detected inside this crate rather than reported by
/// an external command.
pub const INTERNAL_FAILURE: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    code: i32,
    message: String,
    data: Option<T>,
}

impl<T> Outcome<T> {
    pub fn new(code: i32, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    pub fn success(data: T) -> Self {
        Self::new(0, String::new(), Some(data))
    }

    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        Self::new(code, message, None)
    }

    /// Failure detected by this crate (always code 1).
    pub fn internal(message: impl Into<String>) -> Self {
        Self::failure(INTERNAL_FAILURE, message)
    }

    pub fn successful(&self) -> bool {
        self.code == 0
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Transform the payload, keeping code and message.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            code: self.code,
            message: self.message,
            data: self.data.map(f),
        }
    }

    /// Re-type a failure so it can be handed up unchanged. The payload, if
    /// any, is dropped.
    pub fn failure_as<U>(self) -> Outcome<U> {
        Outcome {
            code: self.code,
            message: self.message,
            data: None,
        }
    }
}

impl Outcome<String> {
    /// Build an outcome from a finished external process.
    ///
    /// The exit status becomes the code. On failure the captured output is the
    /// message; on success `default_message` is kept and the output is the
    /// payload.
    pub fn from_output(output: CommandOutput, default_message: impl Into<String>) -> Self {
        if output.code == 0 {
            Self::new(0, default_message, Some(output.text))
        } else {
            Self::failure(output.code, output.text.trim_end().to_string())
        }
    }
}

impl<T> fmt::Display for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.successful() {
            write!(f, "ok")?;
        } else {
            write!(f, "error {}", self.code)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}
