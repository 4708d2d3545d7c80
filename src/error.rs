use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_REDECLARED: &str = "P-ERR-SCOPE-001";
pub const ERR_UNDECLARED: &str = "P-ERR-SCOPE-002";
pub const ERR_REACTIVE: &str = "P-ERR-REACTIVE-001";
pub const ERR_INSERT_BEFORE: &str = "P-ERR-WALK-001";
pub const ERR_INSERT_AFTER: &str = "P-ERR-WALK-002";
pub const ERR_REPLACE: &str = "P-ERR-WALK-003";
pub const ERR_REMOVE: &str = "P-ERR-WALK-004";
pub const ERR_SUB_NAME: &str = "P-ERR-NAME-001";
pub const ERR_PARSE: &str = "P-ERR-SYNTAX-001";
pub const ERR_NOT_SUPPORTED: &str = "P-ERR-SYNTAX-002";
pub const ERR_CONFIG: &str = "P-ERR-CONFIG-001";

/// Every failure aborts the pass it occurs in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{name} has already been declared")]
    VariableRedeclared { name: String },

    #[error("{name} has not been declared")]
    VariableUndeclared { name: String },

    #[error("reactive error: {0}")]
    Reactive(String),

    #[error("cannot insert before: {0}")]
    InsertBefore(&'static str),

    #[error("cannot insert after: {0}")]
    InsertAfter(&'static str),

    #[error("cannot replace: {0}")]
    Replace(&'static str),

    #[error("cannot remove: {0}")]
    Remove(&'static str),

    #[error("placeholder substitution failed: {0}")]
    SubName(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("invalid options: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::VariableRedeclared { .. } => ERR_REDECLARED,
            Error::VariableUndeclared { .. } => ERR_UNDECLARED,
            Error::Reactive(_) => ERR_REACTIVE,
            Error::InsertBefore(_) => ERR_INSERT_BEFORE,
            Error::InsertAfter(_) => ERR_INSERT_AFTER,
            Error::Replace(_) => ERR_REPLACE,
            Error::Remove(_) => ERR_REMOVE,
            Error::SubName(_) => ERR_SUB_NAME,
            Error::Parse(_) => ERR_PARSE,
            Error::NotSupported(_) => ERR_NOT_SUPPORTED,
            Error::Config(_) => ERR_CONFIG,
        }
    }

    pub(crate) fn redeclared(name: impl std::fmt::Display) -> Self {
        Error::VariableRedeclared { name: name.to_string() }
    }

    pub(crate) fn undeclared(name: impl std::fmt::Display) -> Self {
        Error::VariableUndeclared { name: name.to_string() }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_REDECLARED => "A name is declared at most once per scope.",
        ERR_UNDECLARED => {
            "Every reference and assignment resolves to a declaration in an enclosing scope."
        }
        ERR_REACTIVE => {
            "reactive(...) wraps an identifier inside a declaration, expression or return statement."
        }
        ERR_INSERT_BEFORE | ERR_INSERT_AFTER | ERR_REMOVE => {
            "Siblings can only be spliced around nodes held in an array field."
        }
        ERR_REPLACE => "Only nodes with a parent can be replaced.",
        ERR_SUB_NAME => "Every placeholder is substituted with exactly one printable name.",
        ERR_PARSE => "Source text is syntactically valid JavaScript.",
        ERR_NOT_SUPPORTED => "Only the Poly subset of JavaScript is accepted.",
        ERR_CONFIG => "Compile options are well-formed JSON matching the options schema.",
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC
// ═══════════════════════════════════════════════════════════════════════════════

/// Serializable report of a failed pass, handed to the surrounding pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub error_type: String,
    pub message: String,
    pub guarantee: String,
    pub hints: Vec<String>,
}

impl Diagnostic {
    pub fn new(code: &str, message: &str) -> Self {
        Self::with_hints(code, message, vec![])
    }

    pub fn with_hints(code: &str, message: &str, hints: Vec<String>) -> Self {
        Diagnostic {
            code: code.to_string(),
            error_type: "COMPILER_INVARIANT_VIOLATION".to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            hints,
        }
    }
}

impl From<&Error> for Diagnostic {
    fn from(err: &Error) -> Self {
        let hints = match err {
            Error::VariableRedeclared { name } => {
                vec![format!("Rename one of the declarations of `{}`.", name)]
            }
            Error::VariableUndeclared { name } => {
                vec![format!("Declare `{}` with `let` before using it.", name)]
            }
            Error::Reactive(_) => vec!["Use reactive(name) with a plain identifier.".to_string()],
            _ => vec![],
        };
        Diagnostic::with_hints(err.code(), &err.to_string(), hints)
    }
}
