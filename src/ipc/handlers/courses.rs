use crate::db;
use crate::error::{AppError, Result};
use crate::forms::{self, COURSE_FORM};
use crate::ipc::helpers::{db_conn, field_error, optional_str, reply, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{AttendanceStatus, Person};
use crate::store::{self, NewCourseFeedback};
use crate::views;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
struct PlannedRecord {
    person_id: String,
    status: AttendanceStatus,
    note: Option<String>,
}

/// One record per group member. Absent members are recorded as absent even
/// when also marked not-in-course and carry `absent_note` instead of their
/// typed note; the remaining not-in-course members get no record. Ids outside
/// the group have no effect.
fn plan_attendance(
    members: &[Person],
    absent: &HashSet<&str>,
    not_in_course: &HashSet<&str>,
    notes: Option<&BTreeMap<String, String>>,
    absent_note: Option<&str>,
) -> Vec<PlannedRecord> {
    members
        .iter()
        .filter_map(|p| {
            let (status, note) = if absent.contains(p.id.as_str()) {
                (AttendanceStatus::Absent, absent_note.map(str::to_string))
            } else if not_in_course.contains(p.id.as_str()) {
                return None;
            } else {
                (
                    AttendanceStatus::Present,
                    notes.and_then(|n| n.get(&p.id).cloned()),
                )
            };
            Some(PlannedRecord {
                person_id: p.id.clone(),
                status,
                note,
            })
        })
        .collect()
}

/// Members of a group for the checkbox list; no group yields an empty list.
fn handle_courses_roster(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let Some(group_id) = optional_str(req, "groupId") else {
        return Ok(json!({ "persons": [] }));
    };
    let members = store::list_persons_in_group(conn, &group_id)?;
    let persons: Vec<serde_json::Value> = members
        .iter()
        .map(|p| json!({ "id": p.id, "text": p.name_with_nickname() }))
        .collect();
    Ok(json!({ "persons": persons }))
}

fn handle_courses_document(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let form = forms::validate(COURSE_FORM, &req.params)?;
    let feedback = NewCourseFeedback {
        subject_id: form.require_text("subjectId")?.to_string(),
        group_id: form.require_text("groupId")?.to_string(),
        date: form.date("date")?,
        period: form.require_text("period")?.to_string(),
        topic: form.require_text("topic")?.to_string(),
    };
    let absent: HashSet<&str> = form.id_list("absentIds").iter().map(String::as_str).collect();
    let not_in_course: HashSet<&str> = form
        .id_list("notInCourseIds")
        .iter()
        .map(String::as_str)
        .collect();
    let absent_note = Some(state.config.courses.absent_note.trim()).filter(|n| !n.is_empty());

    let (feedback_id, planned) = db::with_tx(conn, |tx| -> Result<(String, Vec<PlannedRecord>)> {
        if store::get_subject(tx, &feedback.subject_id)?.is_none() {
            return Err(field_error(&req.params, "subjectId", "unknown subject area"));
        }
        if store::get_group(tx, &feedback.group_id)?.is_none() {
            return Err(field_error(&req.params, "groupId", "unknown group"));
        }
        let members = store::list_persons_in_group(tx, &feedback.group_id)?;
        let planned = plan_attendance(
            &members,
            &absent,
            &not_in_course,
            form.note_map("notes"),
            absent_note,
        );

        let feedback_id = store::insert_course_feedback(tx, &feedback)?;
        for rec in &planned {
            store::insert_attendance(
                tx,
                &feedback_id,
                &rec.person_id,
                rec.status,
                rec.note.as_deref(),
            )?;
        }
        Ok((feedback_id, planned))
    })?;

    let absent_count = planned
        .iter()
        .filter(|r| r.status == AttendanceStatus::Absent)
        .count();
    info!(
        feedback_id = %feedback_id,
        present = planned.len() - absent_count,
        absent = absent_count,
        "course documented"
    );
    Ok(json!({
        "feedbackId": feedback_id,
        "present": planned.len() - absent_count,
        "absent": absent_count,
    }))
}

fn handle_courses_get(state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let conn = db_conn(state)?;
    let feedback_id = required_str(req, "feedbackId")?;
    let feedback = store::get_course_feedback(conn, &feedback_id)?
        .ok_or_else(|| AppError::not_found("course feedback"))?;
    let records = store::list_attendance_for_feedback(conn, &feedback_id)?;
    Ok(json!({
        "feedback": feedback,
        "attendance": views::attendance_by_status(&records),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "courses.roster" => handle_courses_roster(state, req),
        "courses.document" => handle_courses_document(state, req),
        "courses.get" => handle_courses_get(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
