use crate::error::{AppError, Result};
use crate::ipc::helpers::{optional_str, reply};
use crate::ipc::types::{AppState, Request};
use crate::period;
use chrono::{Local, NaiveTime};
use serde_json::json;

pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| AppError::bad_params(format!("time must be HH:MM, got {:?}", raw)))
}

fn handle_current_period(_state: &mut AppState, req: &Request) -> Result<serde_json::Value> {
    let now = match optional_str(req, "time") {
        Some(raw) => parse_time(&raw)?,
        None => Local::now().time(),
    };
    Ok(json!({
        "period": period::current_period(now),
        "index": period::period_index_at(now),
        "periods": period::labels(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "schedule.currentPeriod" => handle_current_period(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
