use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::period;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub group_id: String,
    pub group_name: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: Option<String>,
    pub grade: i64,
    pub support_needs: Option<String>,
    pub support_measures: Option<String>,
    pub goals: Option<String>,
}

impl Person {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// `Given (Nick) Family`, or `Given Family` without a nickname.
    pub fn name_with_nickname(&self) -> String {
        match self.nickname.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(nick) => format!("{} ({}) {}", self.first_name, nick, self.last_name),
            None => self.full_name(),
        }
    }

    pub fn display(&self) -> String {
        format!("{} – {}", self.name_with_nickname(), self.group_name)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectArea {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicAssignment {
    pub person_id: String,
    pub subject_id: String,
    pub base_topic: Option<String>,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    pub id: String,
    pub person_id: String,
    pub subject_id: Option<String>,
    pub subject_name: Option<String>,
    pub date: NaiveDate,
    pub period: String,
    pub topic: Option<String>,
    pub note: Option<String>,
    pub created_at: String,
    /// Insertion order; breaks ties between entries saved in the same second.
    #[serde(skip)]
    pub seq: i64,
}

impl SessionEntry {
    pub fn period_index(&self) -> Option<u32> {
        period::parse_index(&self.period)
    }

    /// ISO weekday, Monday = 1.
    pub fn weekday(&self) -> u32 {
        self.date.weekday().number_from_monday()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "present" => Some(Self::Present),
            "absent" => Some(Self::Absent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseFeedback {
    pub id: String,
    pub subject_id: String,
    pub subject_name: String,
    pub group_id: String,
    pub group_name: String,
    pub date: NaiveDate,
    pub period: String,
    pub topic: String,
    pub created_at: String,
}

/// One attendance row joined with the course it belongs to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: String,
    pub feedback_id: String,
    pub person_id: String,
    pub person_name: String,
    pub status: AttendanceStatus,
    pub note: Option<String>,
    pub subject_name: String,
    pub date: NaiveDate,
    pub period: String,
    pub topic: String,
}

impl Attendance {
    pub fn period_index(&self) -> Option<u32> {
        period::parse_index(&self.period)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceFeedback {
    pub id: String,
    pub person_id: String,
    pub subject_id: String,
    pub subject_name: String,
    pub date: NaiveDate,
    pub topic: String,
    pub assessment: String,
    pub grade: Option<String>,
    pub created_at: String,
}
