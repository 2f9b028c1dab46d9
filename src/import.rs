//! Person roster import from spreadsheet exports.
//!
//! Uploads arrive as raw bytes of unknown encoding and dialect. Decoding
//! tries UTF-8 first and falls back to Windows-1252, the delimiter is sniffed
//! from a prefix of the text, and every accepted row is written inside one
//! transaction so a failed upload leaves the store untouched.

use std::collections::HashMap;

use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ImportConfig;
use crate::db::with_tx;
use crate::store::{self, PersonFields};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("file is neither UTF-8 nor Windows-1252 text")]
    Decode,

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("store rejected the import: {0}")]
    Store(#[from] rusqlite::Error),
}

impl ImportError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Csv(_) => "csv",
            Self::Store(_) => "store",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Encoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "windows-1252")]
    Windows1252,
}

const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

// Bytes Windows-1252 leaves undefined. The WHATWG decoder maps them to C1
// controls, so they are rejected up front.
const CP1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

fn decode_cp1252(bytes: &[u8]) -> Option<String> {
    if bytes.iter().any(|b| CP1252_UNDEFINED.contains(b)) {
        return None;
    }
    let (text, had_errors) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
    if had_errors {
        return None;
    }
    Some(text.into_owned())
}

pub fn decode_upload(bytes: &[u8]) -> Result<(String, Encoding), ImportError> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        return Ok((text.to_string(), Encoding::Utf8));
    }
    decode_cp1252(bytes)
        .map(|text| (text, Encoding::Windows1252))
        .ok_or(ImportError::Decode)
}

/// Field count of every non-blank record in `sample` when split on `delim`.
/// Quoted fields may span lines.
fn field_counts(sample: &str, delim: u8) -> Vec<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(false)
        .flexible(true)
        .from_reader(sample.as_bytes());
    reader
        .records()
        .map_while(Result::ok)
        .filter(|r| r.iter().any(|f| !f.trim().is_empty()))
        .map(|r| r.len())
        .collect()
}

/// Picks the delimiter that splits every complete record of `sample` into the
/// same number of fields. `truncated` says whether `sample` stops before the
/// end of the text, in which case its last record is incomplete and ignored.
pub fn sniff_delimiter(sample: &str, truncated: bool) -> Option<u8> {
    let mut best: Option<(u8, usize)> = None;
    for &delim in &DELIMITER_CANDIDATES {
        let mut counts = field_counts(sample, delim);
        if truncated && counts.len() > 1 {
            counts.pop();
        }
        let Some(&first) = counts.first() else {
            continue;
        };
        if first < 2 || counts.iter().any(|&n| n != first) {
            continue;
        }
        // Strictly greater keeps the earlier candidate on ties.
        if best.map_or(true, |(_, n)| first > n) {
            best = Some((delim, first));
        }
    }
    best.map(|(d, _)| d)
}

fn sample_prefix(text: &str, max_bytes: usize) -> (&str, bool) {
    if text.len() <= max_bytes {
        return (text, false);
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    (&text[..end], true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    FirstName,
    LastName,
    Nickname,
    Group,
    Grade,
    SupportNeeds,
    SupportMeasures,
    Goals,
}

impl Column {
    fn from_header(raw: &str) -> Option<Self> {
        let col = match raw.trim().to_lowercase().as_str() {
            "vorname" | "first_name" => Self::FirstName,
            "nachname" | "last_name" => Self::LastName,
            "spitzname" | "nickname" => Self::Nickname,
            "lerngruppe" | "group" => Self::Group,
            "stufe" | "grade" => Self::Grade,
            "foerderbedarf" | "support_needs" => Self::SupportNeeds,
            "massnahmen" | "support_measures" => Self::SupportMeasures,
            "ziele" | "goals" => Self::Goals,
            _ => return None,
        };
        Some(col)
    }
}

/// Header position of each recognised column. Unknown headers are ignored.
#[derive(Debug, Default)]
struct ColumnMap {
    positions: HashMap<usize, Column>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let mut positions = HashMap::new();
        for (i, h) in headers.iter().enumerate() {
            if let Some(col) = Column::from_header(h) {
                // First occurrence wins when a header repeats.
                if !positions.values().any(|c| *c == col) {
                    positions.insert(i, col);
                }
            }
        }
        Self { positions }
    }

    fn row(&self, record: &csv::StringRecord) -> ImportRow {
        let mut row = ImportRow::default();
        for (i, value) in record.iter().enumerate() {
            let Some(col) = self.positions.get(&i) else {
                continue;
            };
            let value = value.trim();
            match col {
                Column::FirstName => row.first_name = value.to_string(),
                Column::LastName => row.last_name = value.to_string(),
                Column::Nickname => row.nickname = non_blank(value),
                Column::Group => row.group = value.to_string(),
                Column::Grade => row.grade = value.parse().unwrap_or(0),
                Column::SupportNeeds => row.support_needs = non_blank(value),
                Column::SupportMeasures => row.support_measures = non_blank(value),
                Column::Goals => row.goals = non_blank(value),
            }
        }
        row
    }
}

fn non_blank(v: &str) -> Option<String> {
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportRow {
    pub first_name: String,
    pub last_name: String,
    pub nickname: Option<String>,
    pub group: String,
    pub grade: i64,
    pub support_needs: Option<String>,
    pub support_measures: Option<String>,
    pub goals: Option<String>,
}

#[derive(Debug)]
pub struct ParsedUpload {
    pub delimiter: u8,
    pub rows: Vec<ImportRow>,
    /// Rows dropped for a missing given or family name.
    pub skipped: usize,
}

pub fn parse_rows(text: &str, sniff_bytes: usize) -> Result<ParsedUpload, ImportError> {
    let (sample, truncated) = sample_prefix(text, sniff_bytes);
    let delimiter = sniff_delimiter(sample, truncated).unwrap_or(b',');
    debug!(delimiter = %char::from(delimiter).escape_default(), "sniffed import dialect");

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let columns = ColumnMap::from_headers(reader.headers()?);
    let mut rows = Vec::new();
    let mut skipped = 0;
    for record in reader.records() {
        let row = columns.row(&record?);
        if row.first_name.is_empty() || row.last_name.is_empty() {
            skipped += 1;
            continue;
        }
        rows.push(row);
    }
    Ok(ParsedUpload {
        delimiter,
        rows,
        skipped,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub groups_created: usize,
    pub delimiter: String,
    pub encoding: Encoding,
}

/// Writes `rows`, creating groups on first use. All or nothing.
pub fn apply(
    conn: &Connection,
    rows: &[ImportRow],
    default_group: &str,
) -> Result<(usize, usize), ImportError> {
    with_tx(conn, |tx| -> Result<(usize, usize), ImportError> {
        let mut group_ids: HashMap<String, String> = HashMap::new();
        let mut groups_created = 0;
        for row in rows {
            let name = if row.group.is_empty() {
                default_group
            } else {
                row.group.as_str()
            };
            let group_id = match group_ids.get(name) {
                Some(id) => id.clone(),
                None => {
                    let id = match store::find_group_by_name(tx, name)? {
                        Some(g) => g.id,
                        None => {
                            groups_created += 1;
                            store::insert_group(tx, name)?
                        }
                    };
                    group_ids.insert(name.to_string(), id.clone());
                    id
                }
            };
            store::insert_person(
                tx,
                &PersonFields {
                    group_id,
                    first_name: row.first_name.clone(),
                    last_name: row.last_name.clone(),
                    nickname: row.nickname.clone(),
                    grade: row.grade,
                    support_needs: row.support_needs.clone(),
                    support_measures: row.support_measures.clone(),
                    goals: row.goals.clone(),
                },
            )?;
        }
        Ok((rows.len(), groups_created))
    })
}

pub fn import_persons(
    conn: &Connection,
    bytes: &[u8],
    cfg: &ImportConfig,
) -> Result<ImportReport, ImportError> {
    let (text, encoding) = decode_upload(bytes)?;
    let parsed = parse_rows(&text, cfg.sniff_bytes)?;
    let (imported, groups_created) = apply(conn, &parsed.rows, &cfg.default_group)?;
    info!(
        imported,
        skipped = parsed.skipped,
        groups_created,
        ?encoding,
        "person import committed"
    );
    Ok(ImportReport {
        imported,
        skipped: parsed.skipped,
        groups_created,
        delimiter: char::from(parsed.delimiter).to_string(),
        encoding,
    })
}
