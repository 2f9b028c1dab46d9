//! Row-level reads and writes. Every function takes the store handle
//! explicitly; callers decide the transaction scope.

use chrono::{Local, NaiveDate};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

use crate::model::{
    Attendance, AttendanceStatus, CourseFeedback, Group, PerformanceFeedback, Person,
    SessionEntry, SubjectArea, TopicAssignment,
};

const DATE_FMT: &str = "%Y-%m-%d";

pub fn now_timestamp() -> String {
    Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn date_col(r: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = r.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FMT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn date_param(d: NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

// --- groups ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub id: String,
    pub name: String,
    pub person_count: i64,
}

pub fn list_groups(conn: &Connection) -> rusqlite::Result<Vec<GroupSummary>> {
    let mut stmt = conn.prepare(
        "SELECT
           g.id,
           g.name,
           (SELECT COUNT(*) FROM persons p WHERE p.group_id = g.id) AS person_count
         FROM learning_groups g
         ORDER BY g.name",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(GroupSummary {
                id: r.get(0)?,
                name: r.get(1)?,
                person_count: r.get(2)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    rows
}

pub fn get_group(conn: &Connection, id: &str) -> rusqlite::Result<Option<Group>> {
    conn.query_row(
        "SELECT id, name FROM learning_groups WHERE id = ?",
        [id],
        |r| {
            Ok(Group {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        },
    )
    .optional()
}

pub fn find_group_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<Group>> {
    conn.query_row(
        "SELECT id, name FROM learning_groups WHERE name = ?",
        [name],
        |r| {
            Ok(Group {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        },
    )
    .optional()
}

pub fn insert_group(conn: &Connection, name: &str) -> rusqlite::Result<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO learning_groups(id, name) VALUES(?, ?)",
        params![&id, name],
    )?;
    Ok(id)
}

// --- persons ---

#[derive(Debug, Clone, Default)]
pub struct PersonFields {
    pub group_id: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: Option<String>,
    pub grade: i64,
    pub support_needs: Option<String>,
    pub support_measures: Option<String>,
    pub goals: Option<String>,
}

const PERSON_SELECT: &str = "SELECT p.id, p.group_id, g.name, p.first_name, p.last_name,
        p.nickname, p.grade, p.support_needs, p.support_measures, p.goals
     FROM persons p
     JOIN learning_groups g ON g.id = p.group_id";

fn person_from_row(r: &Row<'_>) -> rusqlite::Result<Person> {
    Ok(Person {
        id: r.get(0)?,
        group_id: r.get(1)?,
        group_name: r.get(2)?,
        first_name: r.get(3)?,
        last_name: r.get(4)?,
        nickname: r.get(5)?,
        grade: r.get(6)?,
        support_needs: r.get(7)?,
        support_measures: r.get(8)?,
        goals: r.get(9)?,
    })
}

/// All persons ordered by group name, then given and family name.
pub fn list_persons(conn: &Connection) -> rusqlite::Result<Vec<Person>> {
    let sql = format!("{PERSON_SELECT} ORDER BY g.name, p.first_name, p.last_name");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], person_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    rows
}

pub fn list_persons_in_group(conn: &Connection, group_id: &str) -> rusqlite::Result<Vec<Person>> {
    let sql = format!("{PERSON_SELECT} WHERE p.group_id = ? ORDER BY p.first_name, p.last_name");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([group_id], person_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    rows
}

pub fn get_person(conn: &Connection, id: &str) -> rusqlite::Result<Option<Person>> {
    let sql = format!("{PERSON_SELECT} WHERE p.id = ?");
    conn.query_row(&sql, [id], person_from_row).optional()
}

pub fn insert_person(conn: &Connection, fields: &PersonFields) -> rusqlite::Result<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO persons(
            id, group_id, first_name, last_name, nickname, grade,
            support_needs, support_measures, goals
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            &id,
            &fields.group_id,
            &fields.first_name,
            &fields.last_name,
            &fields.nickname,
            fields.grade,
            &fields.support_needs,
            &fields.support_measures,
            &fields.goals,
        ],
    )?;
    Ok(id)
}

/// Returns false when no such person exists.
pub fn update_person(conn: &Connection, id: &str, fields: &PersonFields) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE persons SET
            group_id = ?, first_name = ?, last_name = ?, nickname = ?, grade = ?,
            support_needs = ?, support_measures = ?, goals = ?, updated_at = ?
         WHERE id = ?",
        params![
            &fields.group_id,
            &fields.first_name,
            &fields.last_name,
            &fields.nickname,
            fields.grade,
            &fields.support_needs,
            &fields.support_measures,
            &fields.goals,
            now_timestamp(),
            id,
        ],
    )?;
    Ok(changed > 0)
}

// --- subject areas ---

pub fn list_subjects(conn: &Connection) -> rusqlite::Result<Vec<SubjectArea>> {
    let mut stmt = conn.prepare("SELECT id, name FROM subject_areas ORDER BY name")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(SubjectArea {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    rows
}

pub fn get_subject(conn: &Connection, id: &str) -> rusqlite::Result<Option<SubjectArea>> {
    conn.query_row(
        "SELECT id, name FROM subject_areas WHERE id = ?",
        [id],
        |r| {
            Ok(SubjectArea {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        },
    )
    .optional()
}

pub fn insert_subject(conn: &Connection, name: &str) -> rusqlite::Result<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO subject_areas(id, name) VALUES(?, ?)",
        params![&id, name],
    )?;
    Ok(id)
}

// --- topic assignments ---

pub fn get_topic_assignment(
    conn: &Connection,
    person_id: &str,
    subject_id: &str,
) -> rusqlite::Result<Option<TopicAssignment>> {
    conn.query_row(
        "SELECT person_id, subject_id, base_topic, remark
         FROM topic_assignments
         WHERE person_id = ? AND subject_id = ?",
        params![person_id, subject_id],
        |r| {
            Ok(TopicAssignment {
                person_id: r.get(0)?,
                subject_id: r.get(1)?,
                base_topic: r.get(2)?,
                remark: r.get(3)?,
            })
        },
    )
    .optional()
}

pub fn upsert_topic_assignment(conn: &Connection, a: &TopicAssignment) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO topic_assignments(id, person_id, subject_id, base_topic, remark)
         VALUES(?, ?, ?, ?, ?)
         ON CONFLICT(person_id, subject_id) DO UPDATE SET
           base_topic = excluded.base_topic,
           remark = excluded.remark",
        params![new_id(), &a.person_id, &a.subject_id, &a.base_topic, &a.remark],
    )?;
    Ok(())
}

// --- session entries ---

#[derive(Debug, Clone)]
pub struct NewSessionEntry {
    pub person_id: String,
    pub subject_id: Option<String>,
    pub date: NaiveDate,
    pub period: String,
    pub topic: Option<String>,
    pub note: Option<String>,
}

const SESSION_SELECT: &str = "SELECT e.id, e.person_id, e.subject_id, s.name, e.date, e.period,
        e.topic, e.note, e.created_at, e.rowid
     FROM session_entries e
     LEFT JOIN subject_areas s ON s.id = e.subject_id";

fn session_from_row(r: &Row<'_>) -> rusqlite::Result<SessionEntry> {
    Ok(SessionEntry {
        id: r.get(0)?,
        person_id: r.get(1)?,
        subject_id: r.get(2)?,
        subject_name: r.get(3)?,
        date: date_col(r, 4)?,
        period: r.get(5)?,
        topic: r.get(6)?,
        note: r.get(7)?,
        created_at: r.get(8)?,
        seq: r.get(9)?,
    })
}

pub fn insert_session_entry(conn: &Connection, e: &NewSessionEntry) -> rusqlite::Result<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO session_entries(id, person_id, subject_id, date, period, topic, note, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            &id,
            &e.person_id,
            &e.subject_id,
            date_param(e.date),
            &e.period,
            &e.topic,
            &e.note,
            now_timestamp(),
        ],
    )?;
    Ok(id)
}

pub fn list_session_entries_for_person(
    conn: &Connection,
    person_id: &str,
) -> rusqlite::Result<Vec<SessionEntry>> {
    let sql = format!("{SESSION_SELECT} WHERE e.person_id = ? ORDER BY e.date DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([person_id], session_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    rows
}

/// Entries for one subject saved on `day`, newest first.
pub fn list_recent_session_entries(
    conn: &Connection,
    subject_id: &str,
    day: NaiveDate,
    limit: usize,
) -> rusqlite::Result<Vec<SessionEntry>> {
    let sql = format!(
        "{SESSION_SELECT}
         WHERE e.subject_id = ? AND e.created_at >= ? AND e.created_at < ?
         ORDER BY e.created_at DESC, e.rowid DESC
         LIMIT ?"
    );
    let start = format!("{}T00:00:00", date_param(day));
    let next = day.succ_opt().unwrap_or(day);
    let end = format!("{}T00:00:00", date_param(next));
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![subject_id, start, end, limit as i64], session_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    rows
}

// --- course feedback + attendance ---

#[derive(Debug, Clone)]
pub struct NewCourseFeedback {
    pub subject_id: String,
    pub group_id: String,
    pub date: NaiveDate,
    pub period: String,
    pub topic: String,
}

pub fn insert_course_feedback(
    conn: &Connection,
    f: &NewCourseFeedback,
) -> rusqlite::Result<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO course_feedback(id, subject_id, group_id, date, period, topic, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        params![
            &id,
            &f.subject_id,
            &f.group_id,
            date_param(f.date),
            &f.period,
            &f.topic,
            now_timestamp(),
        ],
    )?;
    Ok(id)
}

pub fn insert_attendance(
    conn: &Connection,
    feedback_id: &str,
    person_id: &str,
    status: AttendanceStatus,
    note: Option<&str>,
) -> rusqlite::Result<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO attendance_records(id, feedback_id, person_id, status, note)
         VALUES(?, ?, ?, ?, ?)",
        params![&id, feedback_id, person_id, status.as_str(), note],
    )?;
    Ok(id)
}

pub fn get_course_feedback(
    conn: &Connection,
    id: &str,
) -> rusqlite::Result<Option<CourseFeedback>> {
    conn.query_row(
        "SELECT f.id, f.subject_id, s.name, f.group_id, g.name, f.date, f.period, f.topic, f.created_at
         FROM course_feedback f
         JOIN subject_areas s ON s.id = f.subject_id
         JOIN learning_groups g ON g.id = f.group_id
         WHERE f.id = ?",
        [id],
        |r| {
            Ok(CourseFeedback {
                id: r.get(0)?,
                subject_id: r.get(1)?,
                subject_name: r.get(2)?,
                group_id: r.get(3)?,
                group_name: r.get(4)?,
                date: date_col(r, 5)?,
                period: r.get(6)?,
                topic: r.get(7)?,
                created_at: r.get(8)?,
            })
        },
    )
    .optional()
}

const ATTENDANCE_SELECT: &str = "SELECT a.id, a.feedback_id, a.person_id,
        p.first_name || ' ' || p.last_name, a.status, a.note,
        s.name, f.date, f.period, f.topic
     FROM attendance_records a
     JOIN course_feedback f ON f.id = a.feedback_id
     JOIN subject_areas s ON s.id = f.subject_id
     JOIN persons p ON p.id = a.person_id";

fn attendance_from_row(r: &Row<'_>) -> rusqlite::Result<Attendance> {
    let raw_status: String = r.get(4)?;
    let status = AttendanceStatus::parse(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("unknown attendance status: {}", raw_status).into(),
        )
    })?;
    Ok(Attendance {
        id: r.get(0)?,
        feedback_id: r.get(1)?,
        person_id: r.get(2)?,
        person_name: r.get(3)?,
        status,
        note: r.get(5)?,
        subject_name: r.get(6)?,
        date: date_col(r, 7)?,
        period: r.get(8)?,
        topic: r.get(9)?,
    })
}

pub fn list_attendance_for_person(
    conn: &Connection,
    person_id: &str,
) -> rusqlite::Result<Vec<Attendance>> {
    let sql = format!("{ATTENDANCE_SELECT} WHERE a.person_id = ?");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([person_id], attendance_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    rows
}

pub fn list_attendance_for_feedback(
    conn: &Connection,
    feedback_id: &str,
) -> rusqlite::Result<Vec<Attendance>> {
    let sql = format!("{ATTENDANCE_SELECT} WHERE a.feedback_id = ?");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([feedback_id], attendance_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    rows
}

// --- performance feedback ---

#[derive(Debug, Clone)]
pub struct NewPerformanceFeedback {
    pub person_id: String,
    pub subject_id: String,
    pub date: NaiveDate,
    pub topic: String,
    pub assessment: String,
    pub grade: Option<String>,
}

pub fn insert_performance_feedback(
    conn: &Connection,
    f: &NewPerformanceFeedback,
) -> rusqlite::Result<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO performance_feedback(id, person_id, subject_id, date, topic, assessment, grade, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            &id,
            &f.person_id,
            &f.subject_id,
            date_param(f.date),
            &f.topic,
            &f.assessment,
            &f.grade,
            now_timestamp(),
        ],
    )?;
    Ok(id)
}

pub fn list_performance_for_person(
    conn: &Connection,
    person_id: &str,
) -> rusqlite::Result<Vec<PerformanceFeedback>> {
    let mut stmt = conn.prepare(
        "SELECT f.id, f.person_id, f.subject_id, s.name, f.date, f.topic, f.assessment, f.grade, f.created_at
         FROM performance_feedback f
         JOIN subject_areas s ON s.id = f.subject_id
         WHERE f.person_id = ?
         ORDER BY f.date DESC",
    )?;
    let rows = stmt
        .query_map([person_id], |r| {
            Ok(PerformanceFeedback {
                id: r.get(0)?,
                person_id: r.get(1)?,
                subject_id: r.get(2)?,
                subject_name: r.get(3)?,
                date: date_col(r, 4)?,
                topic: r.get(5)?,
                assessment: r.get(6)?,
                grade: r.get(7)?,
                created_at: r.get(8)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    rows
}
