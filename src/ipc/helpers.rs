use rusqlite::Connection;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AppError, FieldErrors, Result};
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};

pub fn db_conn(state: &AppState) -> Result<&Connection> {
    state.db.as_ref().ok_or(AppError::NoWorkspace)
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn required_str(req: &Request, key: &str) -> Result<String> {
    optional_str(req, key).ok_or_else(|| AppError::bad_params(format!("missing {}", key)))
}

/// A single-field validation failure raised after the schema check, e.g. an
/// id that does not resolve.
pub fn field_error(params: &Value, field: &str, message: &str) -> AppError {
    let mut fields = FieldErrors::new();
    fields.insert(field.to_string(), message.to_string());
    AppError::Validation {
        fields,
        form: params.clone(),
    }
}

/// Turns a handler outcome into a wire response.
pub fn reply(req: &Request, result: Result<Value>) -> Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => {
            match &e {
                AppError::Db(_)
                | AppError::Io(_)
                | AppError::Workspace(_)
                | AppError::Import(_) => {
                    warn!(method = %req.method, code = e.code(), error = %e, "request failed")
                }
                _ => debug!(method = %req.method, code = e.code(), "request rejected"),
            }
            e.response(&req.id)
        }
    }
}
