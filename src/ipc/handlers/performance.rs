use crate::db;
use crate::error::{AppError, Result};
use crate::forms::{self, PERFORMANCE_FORM};
use crate::ipc::helpers::{db_conn, field_error, reply, required_str};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, NewPerformanceFeedback};
use crate::views;
use serde_json::json;
use tracing::info;

fn handle_performance_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let form = forms::validate(PERFORMANCE_FORM, &req.params)?;
    let feedback = NewPerformanceFeedback {
        person_id: form.require_text("personId")?.to_string(),
        subject_id: form.require_text("subjectId")?.to_string(),
        date: form.date("date")?,
        topic: form.require_text("topic")?.to_string(),
        assessment: form.require_text("assessment")?.to_string(),
        grade: form.text_owned("grade"),
    };

    let feedback_id = db::with_tx(conn, |tx| -> Result<String> {
        if store::get_person(tx, &feedback.person_id)?.is_none() {
            return Err(AppError::PersonRequired { candidates: None });
        }
        if store::get_subject(tx, &feedback.subject_id)?.is_none() {
            return Err(field_error(&req.params, "subjectId", "unknown subject area"));
        }
        Ok(store::insert_performance_feedback(tx, &feedback)?)
    })?;
    info!(
        feedback_id = %feedback_id,
        person_id = %feedback.person_id,
        "performance feedback saved"
    );
    Ok(json!({ "feedbackId": feedback_id }))
}

fn handle_performance_list(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let person_id = required_str(req, "personId")?;
    if store::get_person(conn, &person_id)?.is_none() {
        return Err(AppError::not_found("person"));
    }
    let items = store::list_performance_for_person(conn, &person_id)?;
    Ok(json!({ "subjects": views::performance_by_subject(&items) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "performance.create" => handle_performance_create(state, req),
        "performance.list" => handle_performance_list(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
