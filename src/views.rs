//! Display groupings over a person's records: week grid, chronological week
//! list, subject buckets, attendance by status, performance by subject.
//!
//! All functions are pure and independent of the input order.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;
use std::cmp::{Ordering, Reverse};
use std::collections::BTreeMap;

use crate::model::{Attendance, AttendanceStatus, PerformanceFeedback, SessionEntry};
use crate::period;

pub const GRID_PERIODS: u32 = period::PERIOD_COUNT;
pub const GRID_WEEKDAYS: u32 = 5;
pub const NO_SUBJECT_LABEL: &str = "– kein Lernfeld –";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub name: String,
    pub topic: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSlot {
    pub weekday: u32,
    pub cell: Option<GridCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRow {
    pub period: u32,
    pub label: String,
    pub cells: Vec<GridSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekGrid {
    pub year: i32,
    pub week: u32,
    pub monday: NaiveDate,
    pub sunday: NaiveDate,
    pub rows: Vec<GridRow>,
}

impl WeekGrid {
    fn empty(year: i32, week: u32, monday: NaiveDate) -> Self {
        let rows = (0..GRID_PERIODS)
            .map(|p| GridRow {
                period: p,
                label: period::label(p),
                cells: (1..=GRID_WEEKDAYS)
                    .map(|weekday| GridSlot { weekday, cell: None })
                    .collect(),
            })
            .collect();
        Self {
            year,
            week,
            monday,
            sunday: monday + Duration::days(6),
            rows,
        }
    }

    /// `weekday` is ISO (Monday = 1).
    #[cfg(test)]
    pub fn cell(&self, period: u32, weekday: u32) -> Option<&GridCell> {
        if weekday == 0 {
            return None;
        }
        self.rows
            .get(period as usize)?
            .cells
            .get((weekday - 1) as usize)?
            .cell
            .as_ref()
    }

    fn set(&mut self, period: u32, weekday: u32, cell: GridCell) {
        if weekday == 0 {
            return;
        }
        if let Some(slot) = self
            .rows
            .get_mut(period as usize)
            .and_then(|r| r.cells.get_mut((weekday - 1) as usize))
        {
            slot.cell = Some(cell);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekEntries {
    pub year: i32,
    pub week: u32,
    pub monday: NaiveDate,
    pub friday: NaiveDate,
    pub entries: Vec<SessionEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectBucket {
    pub subject: String,
    pub has_subject: bool,
    pub entries: Vec<SessionEntry>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceGroups {
    pub present: Vec<Attendance>,
    pub absent: Vec<Attendance>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceBucket {
    pub subject: String,
    pub entries: Vec<PerformanceFeedback>,
}

fn iso_week_key(date: NaiveDate) -> (i32, u32) {
    let w = date.iso_week();
    (w.year(), w.week())
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date.week(Weekday::Mon).first_day()
}

/// Canonical chronological order; unparseable period labels sort last.
fn chronological(a: &SessionEntry, b: &SessionEntry) -> Ordering {
    a.date
        .cmp(&b.date)
        .then_with(|| {
            a.period_index()
                .unwrap_or(u32::MAX)
                .cmp(&b.period_index().unwrap_or(u32::MAX))
        })
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.seq.cmp(&b.seq))
        .then_with(|| a.id.cmp(&b.id))
}

fn by_iso_week(entries: &[SessionEntry]) -> BTreeMap<(i32, u32), Vec<&SessionEntry>> {
    let mut grouped: BTreeMap<(i32, u32), Vec<&SessionEntry>> = BTreeMap::new();
    for e in entries {
        grouped.entry(iso_week_key(e.date)).or_default().push(e);
    }
    grouped
}

pub fn week_grids(entries: &[SessionEntry]) -> Vec<WeekGrid> {
    let grouped = by_iso_week(entries);
    let mut out = Vec::with_capacity(grouped.len());
    for ((year, week), mut items) in grouped.into_iter().rev() {
        items.sort_by(|a, b| chronological(a, b));
        let mut grid = WeekGrid::empty(year, week, monday_of(items[0].date));
        // Later entries overwrite earlier ones in the same slot.
        for e in items {
            let Some(p) = e.period_index() else { continue };
            let weekday = e.weekday();
            let Some(subject) = e.subject_name.as_ref() else {
                continue;
            };
            if p >= GRID_PERIODS || !(1..=GRID_WEEKDAYS).contains(&weekday) {
                continue;
            }
            grid.set(
                p,
                weekday,
                GridCell {
                    name: subject.clone(),
                    topic: e.topic.clone().unwrap_or_default(),
                    note: e.note.clone().unwrap_or_default(),
                },
            );
        }
        out.push(grid);
    }
    out
}

pub fn week_lists(entries: &[SessionEntry]) -> Vec<WeekEntries> {
    let grouped = by_iso_week(entries);
    let mut out = Vec::with_capacity(grouped.len());
    for ((year, week), items) in grouped.into_iter().rev() {
        let monday = monday_of(items[0].date);
        let mut sorted: Vec<SessionEntry> = items.into_iter().cloned().collect();
        sorted.sort_by(|a, b| {
            a.weekday()
                .cmp(&b.weekday())
                .then_with(|| chronological(a, b))
        });
        out.push(WeekEntries {
            year,
            week,
            monday,
            friday: monday + Duration::days(4),
            entries: sorted,
        });
    }
    out
}

fn subject_order(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x
            .to_lowercase()
            .cmp(&y.to_lowercase())
            .then_with(|| x.cmp(y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn subject_buckets(entries: &[SessionEntry]) -> Vec<SubjectBucket> {
    let mut buckets: Vec<(Option<String>, Vec<SessionEntry>)> = Vec::new();
    for e in entries {
        match buckets.iter_mut().find(|(k, _)| *k == e.subject_name) {
            Some((_, v)) => v.push(e.clone()),
            None => buckets.push((e.subject_name.clone(), vec![e.clone()])),
        }
    }
    buckets.sort_by(|(a, _), (b, _)| subject_order(a, b));

    buckets
        .into_iter()
        .map(|(key, mut items)| {
            items.sort_by(|a, b| chronological(b, a));
            SubjectBucket {
                has_subject: key.is_some(),
                subject: key.unwrap_or_else(|| NO_SUBJECT_LABEL.to_string()),
                entries: items,
            }
        })
        .collect()
}

pub fn attendance_by_status(records: &[Attendance]) -> AttendanceGroups {
    let mut groups = AttendanceGroups::default();
    for r in records {
        match r.status {
            AttendanceStatus::Present => groups.present.push(r.clone()),
            AttendanceStatus::Absent => groups.absent.push(r.clone()),
        }
    }
    let key = |r: &Attendance| {
        (
            Reverse(r.date),
            r.period_index().unwrap_or(u32::MAX),
            r.person_name.to_lowercase(),
            r.id.clone(),
        )
    };
    groups.present.sort_by_key(key);
    groups.absent.sort_by_key(key);
    groups
}

pub fn performance_by_subject(items: &[PerformanceFeedback]) -> Vec<PerformanceBucket> {
    let mut grouped: BTreeMap<(String, String), Vec<PerformanceFeedback>> = BTreeMap::new();
    for it in items {
        grouped
            .entry((it.subject_name.to_lowercase(), it.subject_name.clone()))
            .or_default()
            .push(it.clone());
    }
    grouped
        .into_iter()
        .map(|((_, subject), mut entries)| {
            entries.sort_by(|a, b| {
                b.date
                    .cmp(&a.date)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            });
            PerformanceBucket { subject, entries }
        })
        .collect()
}
