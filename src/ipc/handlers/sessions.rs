use crate::db;
use crate::error::{AppError, Result};
use crate::forms::{self, Form, SESSION_FORM};
use crate::ipc::helpers::{db_conn, field_error, optional_str, reply, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::Person;
use crate::period;
use crate::search::{self, SearchQuery};
use crate::store::{self, NewSessionEntry};
use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde_json::json;
use tracing::{debug, info};

fn parse_now(raw: Option<String>) -> Result<NaiveDateTime> {
    let Some(raw) = raw else {
        return Ok(Local::now().naive_local());
    };
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M"))
        .map_err(|_| AppError::bad_params(format!("now must be YYYY-MM-DDTHH:MM, got {:?}", raw)))
}

fn parse_day(raw: Option<String>) -> Result<NaiveDate> {
    match raw {
        None => Ok(Local::now().date_naive()),
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map_err(|_| AppError::bad_params(format!("date must be YYYY-MM-DD, got {:?}", raw))),
    }
}

/// Picks the person an entry is for: an explicit id, or a loose query that
/// matches exactly one person.
fn resolve_person(conn: &Connection, form: &Form) -> Result<Person> {
    if let Some(id) = form.text("personId") {
        return store::get_person(conn, id)?.ok_or(AppError::PersonRequired { candidates: None });
    }
    let Some(raw) = form.text("personQuery") else {
        return Err(AppError::PersonRequired { candidates: None });
    };
    let query = SearchQuery::parse(raw);
    let persons = store::list_persons(conn)?;
    let hits = search::search(&persons, &query, usize::MAX);
    match hits.as_slice() {
        [only] => Ok((*only).clone()),
        _ => Err(AppError::PersonRequired {
            candidates: Some(hits.len()),
        }),
    }
}

/// Everything the entry form needs before the first keystroke.
fn handle_sessions_prepare(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let subject_id = required_str(req, "subjectId")?;
    let subject = store::get_subject(conn, &subject_id)?
        .ok_or_else(|| AppError::not_found("subject area"))?;
    let now = parse_now(optional_str(req, "now"))?;

    let person = match optional_str(req, "personId") {
        Some(id) => Some(
            store::get_person(conn, &id)?.ok_or_else(|| AppError::not_found("person"))?,
        ),
        None => None,
    };
    let assignment = match &person {
        Some(p) => store::get_topic_assignment(conn, &p.id, &subject_id)?,
        None => None,
    };
    let recent = store::list_recent_session_entries(
        conn,
        &subject_id,
        now.date(),
        state.config.sessions.recent_limit,
    )?;

    Ok(json!({
        "subject": subject,
        "subjects": store::list_subjects(conn)?,
        "date": now.date().format("%Y-%m-%d").to_string(),
        "period": period::current_period(now.time()),
        "periods": period::labels(),
        "person": person.as_ref().map(|p| json!({ "id": p.id, "display": p.display() })),
        "topic": assignment.as_ref().and_then(|a| a.base_topic.clone()).unwrap_or_default(),
        "remark": assignment.as_ref().and_then(|a| a.remark.clone()).unwrap_or_default(),
        "recent": recent,
    }))
}

fn handle_sessions_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let form = forms::validate(SESSION_FORM, &req.params)?;

    let (entry_id, person_id) = db::with_tx(conn, |tx| -> Result<(String, String)> {
        let person = resolve_person(tx, &form)?;
        let subject_id = form.text_owned("subjectId");
        if let Some(sid) = subject_id.as_deref() {
            if store::get_subject(tx, sid)?.is_none() {
                return Err(field_error(&req.params, "subjectId", "unknown subject area"));
            }
        }
        let entry = NewSessionEntry {
            person_id: person.id.clone(),
            subject_id,
            date: form.date("date")?,
            period: form.require_text("period")?.to_string(),
            topic: form.text_owned("topic"),
            note: form.text_owned("note"),
        };
        let id = store::insert_session_entry(tx, &entry)?;
        Ok((id, person.id))
    })?;
    info!(entry_id = %entry_id, person_id = %person_id, "session entry saved");
    Ok(json!({ "entryId": entry_id, "personId": person_id }))
}

fn handle_sessions_recent(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let subject_id = required_str(req, "subjectId")?;
    let day = parse_day(optional_str(req, "date"))?;
    let entries = store::list_recent_session_entries(
        conn,
        &subject_id,
        day,
        state.config.sessions.recent_limit,
    )?;
    debug!(subject_id = %subject_id, count = entries.len(), "recent entries");
    Ok(json!({ "entries": entries }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "sessions.prepare" => handle_sessions_prepare(state, req),
        "sessions.create" => handle_sessions_create(state, req),
        "sessions.recent" => handle_sessions_recent(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
