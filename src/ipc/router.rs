use serde_json::Value;

use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

type Family = fn(&mut AppState, &Request) -> Option<Value>;

/// Each family claims its own method names and passes on the rest.
const FAMILIES: &[Family] = &[
    handlers::core::try_handle,
    handlers::groups::try_handle,
    handlers::persons::try_handle,
    handlers::subjects::try_handle,
    handlers::schedule::try_handle,
    handlers::sessions::try_handle,
    handlers::topics::try_handle,
    handlers::courses::try_handle,
    handlers::performance::try_handle,
];

pub fn handle_request(state: &mut AppState, req: Request) -> Value {
    FAMILIES
        .iter()
        .find_map(|family| family(state, &req))
        .unwrap_or_else(|| {
            err(
                &req.id,
                "not_implemented",
                format!("unknown method: {}", req.method),
                None,
            )
        })
}
