use crate::db;
use crate::error::Result;
use crate::forms::{self, NAME_FORM};
use crate::ipc::helpers::{db_conn, field_error, reply};
use crate::ipc::types::{AppState, Request};
use crate::store;
use serde_json::json;
use tracing::info;

fn handle_groups_list(state: &mut AppState, _req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let groups = store::list_groups(conn)?;
    Ok(json!({ "groups": groups }))
}

fn handle_groups_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let form = forms::validate(NAME_FORM, &req.params)?;
    let name = form.require_text("name")?.to_string();

    let group_id = db::with_tx(conn, |tx| -> Result<String> {
        if store::find_group_by_name(tx, &name)?.is_some() {
            return Err(field_error(
                &req.params,
                "name",
                "a group with this name already exists",
            ));
        }
        Ok(store::insert_group(tx, &name)?)
    })?;
    info!(group_id = %group_id, "group created");
    Ok(json!({ "groupId": group_id, "name": name }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "groups.list" => handle_groups_list(state, req),
        "groups.create" => handle_groups_create(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
