use crate::db;
use crate::error::Result;
use crate::forms::{self, NAME_FORM};
use crate::ipc::helpers::{db_conn, reply};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;
use tracing::info;

fn handle_subjects_list(state: &mut AppState, _req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    Ok(json!({ "subjects": store::list_subjects(conn)? }))
}

fn handle_subjects_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let form = forms::validate(NAME_FORM, &req.params)?;
    let name = form.require_text("name")?;
    let subject_id = db::with_tx(conn, |tx| store::insert_subject(tx, name))?;
    info!(subject_id = %subject_id, "subject area created");
    Ok(json!({ "subjectId": subject_id, "name": name }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "subjects.list" => handle_subjects_list(state, req),
        "subjects.create" => handle_subjects_create(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
