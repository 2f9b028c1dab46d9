use crate::db;
use crate::error::{AppError, Result};
use crate::forms::{self, TOPIC_FORM};
use crate::ipc::helpers::{db_conn, optional_str, reply};
use crate::ipc::types::{AppState, Request};
use crate::model::TopicAssignment;
use crate::store;
use serde_json::json;
use tracing::info;

/// Missing ids or no assignment both yield empty suggestions.
fn handle_topics_suggest(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let assignment = match (optional_str(req, "personId"), optional_str(req, "subjectId")) {
        (Some(pid), Some(sid)) => store::get_topic_assignment(conn, &pid, &sid)?,
        _ => None,
    };
    Ok(json!({
        "baseTopic": assignment.as_ref().and_then(|a| a.base_topic.clone()).unwrap_or_default(),
        "remark": assignment.as_ref().and_then(|a| a.remark.clone()).unwrap_or_default(),
    }))
}

fn handle_topics_assign(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let form = forms::validate(TOPIC_FORM, &req.params)?;
    let assignment = TopicAssignment {
        person_id: form.require_text("personId")?.to_string(),
        subject_id: form.require_text("subjectId")?.to_string(),
        base_topic: form.text_owned("baseTopic"),
        remark: form.text_owned("remark"),
    };

    db::with_tx(conn, |tx| -> Result<()> {
        if store::get_person(tx, &assignment.person_id)?.is_none() {
            return Err(AppError::not_found("person"));
        }
        if store::get_subject(tx, &assignment.subject_id)?.is_none() {
            return Err(AppError::not_found("subject area"));
        }
        store::upsert_topic_assignment(tx, &assignment)?;
        Ok(())
    })?;
    info!(
        person_id = %assignment.person_id,
        subject_id = %assignment.subject_id,
        "topic assignment saved"
    );
    Ok(json!({ "assignment": assignment }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "topics.suggest" => handle_topics_suggest(state, req),
        "topics.assign" => handle_topics_assign(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
