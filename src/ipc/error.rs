use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct WireError {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Envelope<'a> {
    Ok {
        id: &'a str,
        ok: bool,
        result: Value,
    },
    Err {
        id: &'a str,
        ok: bool,
        error: WireError,
    },
}

fn to_value(envelope: Envelope<'_>) -> Value {
    serde_json::to_value(envelope).unwrap_or(Value::Null)
}

pub fn ok(id: &str, result: Value) -> Value {
    to_value(Envelope::Ok {
        id,
        ok: true,
        result,
    })
}

pub fn err(id: &str, code: &str, message: impl Into<String>, details: Option<Value>) -> Value {
    to_value(Envelope::Err {
        id,
        ok: false,
        error: WireError {
            code: code.to_string(),
            message: message.into(),
            details,
        },
    })
}

/// Reply to a line that did not parse; there is no id to echo.
pub fn bad_json(message: impl Into<String>) -> Value {
    err("", "bad_json", message, None)
}
