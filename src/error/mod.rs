//! Error handling for the database engine.
//!
//! All fallible operations in the crate return [`Result`]. The error kinds
//! mirror the stages of the pipeline: lexing/parsing produce [`Error::Syntax`]
//! with a source position, while catalog validation, expression evaluation,
//! constraint enforcement, and persistence produce the remaining variants.

use thiserror::Error;

/// An error produced while executing a statement.
#[derive(Debug, Error)]
pub enum Error {
    /// Lex or parse failure, with the 1-based source position.
    #[error("syntax error: {message} (line {line}, column {column})")]
    Syntax {
        message: String,
        line: u32,
        column: u32,
    },

    /// Unknown table/column, duplicate name, or invalid declaration.
    #[error("schema error: {0}")]
    Schema(String),

    /// Value incompatible with a declared type or an invalid comparison.
    #[error("type error: {0}")]
    Type(String),

    /// NOT NULL, UNIQUE/PRIMARY KEY, or VARCHAR length violation.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Missing row addressed by row id (internal to the executor).
    #[error("not found: {0}")]
    NotFound(String),

    /// Persistence failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a syntax error at the given 1-based position.
    pub fn syntax(message: impl Into<String>, line: u32, column: u32) -> Self {
        Error::Syntax {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Error::Schema(message.into())
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Error::Type(message.into())
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Error::Constraint(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound(message.into())
    }

    /// Short kind tag used by the shell when printing failures.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Syntax { .. } => "syntax",
            Error::Schema(_) => "schema",
            Error::Type(_) => "type",
            Error::Constraint(_) => "constraint",
            Error::NotFound(_) => "not found",
            Error::Io(_) => "io",
        }
    }

    /// The bare message without the kind prefix; the shell composes
    /// `error: <kind>: <message>` from this and [`Error::kind`].
    pub fn message(&self) -> String {
        match self {
            Error::Syntax {
                message,
                line,
                column,
            } => format!("{} (line {}, column {})", message, line, column),
            Error::Schema(msg)
            | Error::Type(msg)
            | Error::Constraint(msg)
            | Error::NotFound(msg) => msg.clone(),
            Error::Io(e) => e.to_string(),
        }
    }
}

/// A specialized Result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;
