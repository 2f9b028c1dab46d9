use crate::db;
use crate::error::{AppError, Result};
use crate::forms::{self, Form, PERSON_FORM};
use crate::import;
use crate::ipc::helpers::{db_conn, field_error, optional_str, reply, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::Person;
use crate::search::{self, SearchQuery};
use crate::store::{self, PersonFields};
use crate::views;
use rusqlite::Connection;
use serde_json::json;
use std::path::PathBuf;
use tracing::{debug, info};

fn person_fields(conn: &Connection, req: &Request, form: &Form) -> Result<PersonFields> {
    let group_id = form.require_text("groupId")?.to_string();
    if store::get_group(conn, &group_id)?.is_none() {
        return Err(field_error(&req.params, "groupId", "unknown group"));
    }
    Ok(PersonFields {
        group_id,
        first_name: form.require_text("firstName")?.to_string(),
        last_name: form.require_text("lastName")?.to_string(),
        nickname: form.text_owned("nickname"),
        grade: form.integer("grade")?,
        support_needs: form.text_owned("supportNeeds"),
        support_measures: form.text_owned("supportMeasures"),
        goals: form.text_owned("goals"),
    })
}

fn search_hit(p: &Person) -> serde_json::Value {
    json!({ "id": p.id, "display": p.display() })
}

/// Everyone, bucketed by group name in group order.
fn handle_persons_list(state: &mut AppState, _req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let persons = store::list_persons(conn)?;

    let mut buckets: Vec<(String, String, Vec<Person>)> = Vec::new();
    for p in persons {
        match buckets.last_mut() {
            Some((gid, _, members)) if *gid == p.group_id => members.push(p),
            _ => buckets.push((p.group_id.clone(), p.group_name.clone(), vec![p])),
        }
    }
    let groups: Vec<serde_json::Value> = buckets
        .into_iter()
        .map(|(gid, gname, members)| {
            json!({ "groupId": gid, "groupName": gname, "persons": members })
        })
        .collect();
    Ok(json!({ "groups": groups }))
}

fn handle_persons_get(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let person_id = required_str(req, "personId")?;
    let person = store::get_person(conn, &person_id)?.ok_or_else(|| AppError::not_found("person"))?;

    let entries = store::list_session_entries_for_person(conn, &person_id)?;
    let attendance = store::list_attendance_for_person(conn, &person_id)?;
    let performance = store::list_performance_for_person(conn, &person_id)?;
    debug!(person_id = %person_id, entries = entries.len(), "person detail loaded");

    Ok(json!({
        "person": person,
        "display": person.name_with_nickname(),
        "weekGrids": views::week_grids(&entries),
        "entryWeeks": views::week_lists(&entries),
        "entrySubjects": views::subject_buckets(&entries),
        "attendance": views::attendance_by_status(&attendance),
        "performance": views::performance_by_subject(&performance),
    }))
}

fn handle_persons_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let form = forms::validate(PERSON_FORM, &req.params)?;
    let person_id = db::with_tx(conn, |tx| {
        let fields = person_fields(tx, req, &form)?;
        Ok::<_, AppError>(store::insert_person(tx, &fields)?)
    })?;
    info!(person_id = %person_id, "person created");
    Ok(json!({ "personId": person_id }))
}

fn handle_persons_update(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let person_id = required_str(req, "personId")?;
    if store::get_person(conn, &person_id)?.is_none() {
        return Err(AppError::not_found("person"));
    }
    let form = forms::validate(PERSON_FORM, &req.params)?;
    db::with_tx(conn, |tx| -> Result<()> {
        let fields = person_fields(tx, req, &form)?;
        if !store::update_person(tx, &person_id, &fields)? {
            return Err(AppError::not_found("person"));
        }
        Ok(())
    })?;
    info!(person_id = %person_id, "person updated");
    Ok(json!({ "personId": person_id }))
}

fn handle_persons_search(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let query = SearchQuery::parse(&optional_str(req, "q").unwrap_or_default());
    let persons = store::list_persons(conn)?;
    let hits = search::search(&persons, &query, state.config.search.page_size);
    debug!(hits = hits.len(), empty_query = query.is_empty(), "person search");
    Ok(json!({
        "results": hits.into_iter().map(search_hit).collect::<Vec<_>>()
    }))
}

fn handle_persons_import(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let path = PathBuf::from(required_str(req, "path")?);
    if !path.is_file() {
        return Err(AppError::not_found("upload"));
    }
    let bytes = std::fs::read(&path)?;
    let report = import::import_persons(conn, &bytes, &state.config.import)?;
    Ok(json!(report))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "persons.list" => handle_persons_list(state, req),
        "persons.get" => handle_persons_get(state, req),
        "persons.create" => handle_persons_create(state, req),
        "persons.update" => handle_persons_update(state, req),
        "persons.search" => handle_persons_search(state, req),
        "persons.import" => handle_persons_import(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
