//! Error types for the Ducky Script compiler

use std::fmt;
use thiserror::Error;

/// Fatal errors. These abort a compile before (or after) the line pass,
/// never during it.
#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Table error in {path}: {message}")]
    Table { path: String, message: String },

    #[error("Invalid layout name: {name}")]
    InvalidLayout { name: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },
}

pub type Result<T> = std::result::Result<T, CompilerError>;

impl CompilerError {
    pub fn table(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Table {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }
}

/// A failure confined to a single script line. The interpreter catches these
/// at the line boundary and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("{keyword} requires an argument")]
    MissingArgument { keyword: String },

    #[error("invalid number '{value}' for {keyword}")]
    InvalidNumber { keyword: String, value: String },

    #[error("REPEAT count {count} is out of range (expected at most {})", crate::instruction::MAX_REPEAT)]
    RepeatOutOfRange { count: i64 },

    #[error("REPEAT has no previous instruction to repeat")]
    RepeatWithoutInstruction,

    #[error("symbol {name} is not defined in the base table")]
    MissingSymbol { name: String },

    #[error("cannot resolve an empty key name")]
    EmptyMnemonic,
}

impl LineError {
    pub fn missing_argument(keyword: impl Into<String>) -> Self {
        Self::MissingArgument {
            keyword: keyword.into(),
        }
    }

    pub fn invalid_number(keyword: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidNumber {
            keyword: keyword.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// A symbol could not be resolved and was replaced by a zero byte.
    Warning,
    /// The rest of the line was abandoned.
    Error,
}

/// A diagnostic attached to a 1-based script line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(line: usize, error: &LineError) -> Self {
        Self {
            line,
            severity: Severity::Error,
            message: error.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{} at line {}: {}", label, self.line, self.message)
    }
}
