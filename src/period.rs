use chrono::NaiveTime;

/// Start times of the daily work periods ("Arbeitsphasen"), ascending.
/// Index in this table is the period number.
const PERIOD_STARTS: [(u32, u32); 7] = [
    (7, 30),
    (9, 0),
    (10, 30),
    (12, 0),
    (13, 30),
    (15, 0),
    (16, 30),
];

pub const PERIOD_COUNT: u32 = PERIOD_STARTS.len() as u32;

pub fn label(index: u32) -> String {
    format!("{}.AP", index)
}

pub fn labels() -> Vec<String> {
    (0..PERIOD_COUNT).map(label).collect()
}

/// Index of the highest period whose start is <= `now`. Times before the
/// first start fall into period 0.
pub fn period_index_at(now: NaiveTime) -> u32 {
    let mut current = 0u32;
    for (i, (h, m)) in PERIOD_STARTS.iter().enumerate() {
        let Some(start) = NaiveTime::from_hms_opt(*h, *m, 0) else {
            continue;
        };
        if now >= start {
            current = i as u32;
        }
    }
    current
}

pub fn current_period(now: NaiveTime) -> String {
    label(period_index_at(now))
}

/// Leading integer of a period label: `"2.AP"` -> 2.
pub fn parse_index(label: &str) -> Option<u32> {
    label.trim().split('.').next()?.trim().parse::<u32>().ok()
}

pub fn is_valid_label(label: &str) -> bool {
    labels().iter().any(|l| l == label.trim())
}
