//! Error types for request handling.
//!
//! Every handler returns `Result<_, AppError>`; the router turns the error
//! into a wire response via [`AppError::response`].

use serde_json::json;
use thiserror::Error;

use crate::import::ImportError;
use crate::ipc::error::err;

/// Field name -> message.
pub type FieldErrors = std::collections::BTreeMap<String, String>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("select a workspace first")]
    NoWorkspace,

    #[error("{0}")]
    BadParams(String),

    /// The submitted form is echoed back so the caller can re-render it.
    #[error("form has {} invalid field(s)", .fields.len())]
    Validation {
        fields: FieldErrors,
        form: serde_json::Value,
    },

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A write that needs a person was submitted without a resolvable one.
    #[error("please select a person")]
    PersonRequired {
        /// Number of persons matching the loose query, if one was given.
        candidates: Option<usize>,
    },

    #[error("import failed: {0}")]
    Import(#[from] ImportError),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0:#}")]
    Workspace(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::BadParams(message.into())
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NoWorkspace => "no_workspace",
            Self::BadParams(_) => "bad_params",
            Self::Validation { .. } => "validation_failed",
            Self::NotFound { .. } => "not_found",
            Self::PersonRequired { .. } => "person_required",
            Self::Import(_) => "import_failed",
            Self::Db(_) => "db_error",
            Self::Io(_) | Self::Workspace(_) => "io_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation { fields, form } => Some(json!({ "fields": fields, "form": form })),
            Self::NotFound { entity } => Some(json!({ "entity": entity })),
            Self::PersonRequired { candidates } => Some(json!({ "candidates": candidates })),
            Self::Import(e) => Some(json!({ "imported": 0, "reason": e.kind() })),
            _ => None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        let details = self.details();
        err(id, self.code(), self.to_string(), details)
    }
}
