//! Redaction of token material before it reaches logs

use serde_json::Value;

const REDACTED: &str = "[REDACTED]";

/// JSON fields whose values are credentials
const SENSITIVE_FIELDS: &[&str] = &[
    "access_token",
    "refresh_token",
    "id_token",
    "client_assertion",
];

/// Shorten a bearer credential to a recognizable, non-usable prefix
///
/// Short values are hidden entirely.
///
/// # Examples
///
/// ```
/// use abm_verify::redact::redact_token;
///
/// assert_eq!(redact_token("abc123"), "[REDACTED]");
/// assert_eq!(redact_token("eyJhbGciOiJFUzI1NiJ9.payload"), "eyJhbG...(28 chars)");
/// ```
pub fn redact_token(token: &str) -> String {
    let len = token.chars().count();
    if len <= 12 {
        return REDACTED.to_string();
    }
    let prefix: String = token.chars().take(6).collect();
    format!("{prefix}...({len} chars)")
}

/// Replace credential fields in a JSON body with a placeholder
///
/// Bodies that are not JSON are summarized by size only, since there is no
/// way to tell which part of them is secret.
pub fn redact_json_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(mut value) => {
            redact_value(&mut value);
            value.to_string()
        }
        Err(_) => format!("<{} bytes, not JSON>", body.len()),
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if SENSITIVE_FIELDS.contains(&key.as_str()) {
                    *field = Value::String(REDACTED.to_string());
                } else {
                    redact_value(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {}
    }
}
