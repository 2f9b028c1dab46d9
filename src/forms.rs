//! Declarative request validation.
//!
//! Each write method has a schema listing its fields. [`validate`] checks the
//! whole submission against the schema before anything touches the store and
//! reports every failing field at once.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::{AppError, FieldErrors, Result};
use crate::period;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Trimmed string; blank counts as missing.
    Text,
    Integer,
    /// `YYYY-MM-DD`
    Date,
    /// One of the period labels.
    Period,
    Id,
    /// Array of ids; missing means empty.
    IdList,
    /// Object of id -> note; blank notes are dropped.
    NoteMap,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn required(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: true,
    }
}

const fn optional(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: false,
    }
}

pub const PERSON_FORM: &[FieldSpec] = &[
    required("firstName", FieldKind::Text),
    required("lastName", FieldKind::Text),
    optional("nickname", FieldKind::Text),
    required("groupId", FieldKind::Id),
    required("grade", FieldKind::Integer),
    optional("supportNeeds", FieldKind::Text),
    optional("supportMeasures", FieldKind::Text),
    optional("goals", FieldKind::Text),
];

/// The person is resolved separately from `personId` or `personQuery`.
pub const SESSION_FORM: &[FieldSpec] = &[
    optional("subjectId", FieldKind::Id),
    optional("personId", FieldKind::Id),
    optional("personQuery", FieldKind::Text),
    required("date", FieldKind::Date),
    required("period", FieldKind::Period),
    required("topic", FieldKind::Text),
    optional("note", FieldKind::Text),
];

pub const NAME_FORM: &[FieldSpec] = &[required("name", FieldKind::Text)];

pub const COURSE_FORM: &[FieldSpec] = &[
    required("subjectId", FieldKind::Id),
    required("groupId", FieldKind::Id),
    required("date", FieldKind::Date),
    required("period", FieldKind::Period),
    required("topic", FieldKind::Text),
    optional("absentIds", FieldKind::IdList),
    optional("notInCourseIds", FieldKind::IdList),
    optional("notes", FieldKind::NoteMap),
];

pub const PERFORMANCE_FORM: &[FieldSpec] = &[
    required("personId", FieldKind::Id),
    required("subjectId", FieldKind::Id),
    required("date", FieldKind::Date),
    required("topic", FieldKind::Text),
    required("assessment", FieldKind::Text),
    optional("grade", FieldKind::Text),
];

pub const TOPIC_FORM: &[FieldSpec] = &[
    required("personId", FieldKind::Id),
    required("subjectId", FieldKind::Id),
    optional("baseTopic", FieldKind::Text),
    optional("remark", FieldKind::Text),
];

#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Text(String),
    Integer(i64),
    Date(NaiveDate),
    IdList(Vec<String>),
    NoteMap(BTreeMap<String, String>),
}

/// A submission that passed its schema.
#[derive(Debug, Default)]
pub struct Form {
    values: HashMap<&'static str, FieldValue>,
}

impl Form {
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn text_owned(&self, name: &str) -> Option<String> {
        self.text(name).map(str::to_string)
    }

    pub fn require_text(&self, name: &str) -> Result<&str> {
        self.text(name)
            .ok_or_else(|| AppError::bad_params(format!("missing {}", name)))
    }

    pub fn integer(&self, name: &str) -> Result<i64> {
        match self.values.get(name) {
            Some(FieldValue::Integer(n)) => Ok(*n),
            _ => Err(AppError::bad_params(format!("missing {}", name))),
        }
    }

    pub fn date(&self, name: &str) -> Result<NaiveDate> {
        match self.values.get(name) {
            Some(FieldValue::Date(d)) => Ok(*d),
            _ => Err(AppError::bad_params(format!("missing {}", name))),
        }
    }

    pub fn id_list(&self, name: &str) -> &[String] {
        match self.values.get(name) {
            Some(FieldValue::IdList(ids)) => ids,
            _ => &[],
        }
    }

    pub fn note_map(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        match self.values.get(name) {
            Some(FieldValue::NoteMap(m)) => Some(m),
            _ => None,
        }
    }
}

const MSG_REQUIRED: &str = "this field is required";

fn blank_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        }
        _ => None,
    }
}

fn is_missing(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

fn check_field(spec: &FieldSpec, raw: &Value) -> std::result::Result<FieldValue, String> {
    match spec.kind {
        FieldKind::Text | FieldKind::Id => blank_text(raw)
            .map(FieldValue::Text)
            .ok_or_else(|| "must be text".to_string()),
        FieldKind::Integer => match raw {
            Value::Number(n) => n
                .as_i64()
                .map(FieldValue::Integer)
                .ok_or_else(|| "must be a whole number".to_string()),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| "must be a whole number".to_string()),
            _ => Err("must be a whole number".to_string()),
        },
        FieldKind::Date => raw
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
            .map(FieldValue::Date)
            .ok_or_else(|| "must be a date (YYYY-MM-DD)".to_string()),
        FieldKind::Period => match raw.as_str().map(str::trim) {
            Some(label) if period::is_valid_label(label) => Ok(FieldValue::Text(label.to_string())),
            _ => Err(format!(
                "must be one of {}",
                period::labels().join(", ")
            )),
        },
        FieldKind::IdList => {
            let items = raw
                .as_array()
                .ok_or_else(|| "must be a list of ids".to_string())?;
            let mut ids = Vec::with_capacity(items.len());
            for item in items {
                match blank_text(item) {
                    Some(id) => ids.push(id),
                    None => return Err("must be a list of ids".to_string()),
                }
            }
            Ok(FieldValue::IdList(ids))
        }
        FieldKind::NoteMap => {
            let obj = raw
                .as_object()
                .ok_or_else(|| "must map ids to notes".to_string())?;
            let mut notes = BTreeMap::new();
            for (id, note) in obj {
                match note {
                    Value::String(_) => {
                        if let Some(text) = blank_text(note) {
                            notes.insert(id.clone(), text);
                        }
                    }
                    Value::Null => {}
                    _ => return Err("must map ids to notes".to_string()),
                }
            }
            Ok(FieldValue::NoteMap(notes))
        }
    }
}

/// Validates `params` against `schema` as one unit.
///
/// On failure the error carries one message per failing field plus the
/// submitted params, untouched, for re-display.
pub fn validate(schema: &[FieldSpec], params: &Value) -> Result<Form> {
    let mut form = Form::default();
    let mut fields = FieldErrors::new();

    for spec in schema {
        let raw = params.get(spec.name);
        if is_missing(raw) {
            if spec.required {
                fields.insert(spec.name.to_string(), MSG_REQUIRED.to_string());
            }
            continue;
        }
        let Some(raw) = raw else { continue };
        match check_field(spec, raw) {
            Ok(value) => {
                form.values.insert(spec.name, value);
            }
            Err(msg) => {
                fields.insert(spec.name.to_string(), msg);
            }
        }
    }

    if fields.is_empty() {
        Ok(form)
    } else {
        Err(AppError::Validation {
            fields,
            form: params.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_errors(err: AppError) -> FieldErrors {
        match err {
            AppError::Validation { fields, .. } => fields,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn valid_person_form_exposes_typed_values() {
        let form = validate(
            PERSON_FORM,
            &json!({
                "firstName": "  Anna ",
                "lastName": "Berg",
                "groupId": "g1",
                "grade": "5",
                "nickname": ""
            }),
        )
        .expect("valid");
        assert_eq!(form.text("firstName"), Some("Anna"));
        assert_eq!(form.integer("grade").expect("grade"), 5);
        assert_eq!(form.text("nickname"), None);
    }

    #[test]
    fn every_failing_field_is_reported() {
        let params = json!({ "firstName": "Anna", "grade": "fünf" });
        let fields = field_errors(validate(PERSON_FORM, &params).expect_err("invalid"));
        assert_eq!(fields.get("lastName").map(String::as_str), Some(MSG_REQUIRED));
        assert_eq!(fields.get("groupId").map(String::as_str), Some(MSG_REQUIRED));
        assert_eq!(
            fields.get("grade").map(String::as_str),
            Some("must be a whole number")
        );
        assert!(!fields.contains_key("firstName"));
    }

    #[test]
    fn submitted_params_are_echoed_back() {
        let params = json!({ "name": "   " });
        match validate(NAME_FORM, &params).expect_err("blank") {
            AppError::Validation { form, .. } => assert_eq!(form, params),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn session_form_checks_date_and_period() {
        let params = json!({ "date": "14.10.2026", "period": "7.AP", "topic": "Brüche" });
        let fields = field_errors(validate(SESSION_FORM, &params).expect_err("invalid"));
        assert!(fields["date"].contains("YYYY-MM-DD"));
        assert!(fields["period"].contains("6.AP"));

        let ok = validate(
            SESSION_FORM,
            &json!({ "date": "2026-10-13", "period": "2.AP", "topic": "Brüche" }),
        )
        .expect("valid");
        assert_eq!(ok.date("date").expect("date").to_string(), "2026-10-13");
        assert_eq!(ok.text("period"), Some("2.AP"));
    }

    #[test]
    fn course_lists_and_notes_default_to_empty() {
        let form = validate(
            COURSE_FORM,
            &json!({
                "subjectId": "s1",
                "groupId": "g1",
                "date": "2026-10-13",
                "period": "1.AP",
                "topic": "Wasser",
                "notes": { "p1": "  ", "p2": "gut mitgemacht" }
            }),
        )
        .expect("valid");
        assert!(form.id_list("absentIds").is_empty());
        let notes = form.note_map("notes").expect("notes");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes["p2"], "gut mitgemacht");
    }

    #[test]
    fn malformed_id_list_is_a_field_error() {
        let params = json!({
            "subjectId": "s1",
            "groupId": "g1",
            "date": "2026-10-13",
            "period": "1.AP",
            "topic": "Wasser",
            "absentIds": "p1"
        });
        let fields = field_errors(validate(COURSE_FORM, &params).expect_err("invalid"));
        assert_eq!(fields["absentIds"], "must be a list of ids");
    }

    #[test]
    fn non_object_params_fail_all_required_fields() {
        let fields = field_errors(validate(TOPIC_FORM, &Value::Null).expect_err("invalid"));
        assert_eq!(fields.len(), 2);
    }
}
