//! crates/post_planner_core/src/normalizer.rs
//!
//! Converts raw remote payloads into canonical typed results.
//!
//! The remote service wraps its answers inconsistently: a result may arrive as a
//! bare object, as a string holding encoded JSON, or as a one-element list of
//! either. Nothing outside this module looks at a raw payload.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use crate::domain::{
    Action, CalendarSnapshot, ContentResult, DictationFragment, DictationTarget, PostStatus,
    ScheduledPost,
};
use crate::ports::{CoreError, CoreResult, ErrorKind, RemoteReply};

static ESCAPED_LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\r\\n|\\n").expect("line break pattern is valid"));

/// The single typed shape every normalized reply takes.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Content(ContentResult),
    Calendar(CalendarSnapshot),
    /// The remote service confirmed the request without returning data.
    Acknowledged,
}

//=========================================================================================
// Content
//=========================================================================================

/// Normalizes the reply to a dispatched action. Post-class actions are only
/// acknowledged; every other action must yield a content result.
pub fn normalize(action: &Action, reply: RemoteReply) -> CoreResult<Normalized> {
    if action.is_post_class() {
        normalize_acknowledgement(reply).map(|()| Normalized::Acknowledged)
    } else {
        normalize_content(reply).map(Normalized::Content)
    }
}

pub fn normalize_content(reply: RemoteReply) -> CoreResult<ContentResult> {
    if !reply.is_success() {
        return Err(server_failure(&reply));
    }
    let record = unwrap_record(reply.payload)?;

    let text = record
        .get("result_text")
        .and_then(Value::as_str)
        .ok_or_else(|| missing_field("result_text"))?;
    let is_news = record
        .get("is_news")
        .and_then(read_flag)
        .ok_or_else(|| missing_field("is_news"))?;
    let image_url = record
        .get("result_image")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(ContentResult {
        text: sanitize_text(text),
        is_news,
        image_url,
    })
}

/// Accepts any successful reply unless its body explicitly declines the request.
pub fn normalize_acknowledgement(reply: RemoteReply) -> CoreResult<()> {
    if !reply.is_success() {
        return Err(server_failure(&reply));
    }
    if explicitly_declined(&reply.payload) {
        return Err(CoreError::new(
            ErrorKind::Rollback,
            "The server declined the request",
        ));
    }
    Ok(())
}

pub fn normalize_transcription(
    reply: RemoteReply,
    target: DictationTarget,
) -> CoreResult<DictationFragment> {
    if !reply.is_success() {
        return Err(server_failure(&reply));
    }
    let record = unwrap_record(reply.payload)?;
    let text = record
        .get("transcription")
        .and_then(Value::as_str)
        .ok_or_else(|| missing_field("transcription"))?;
    Ok(DictationFragment {
        target,
        text: sanitize_text(text).trim().to_string(),
    })
}

/// Rewrites literal `\n` sequences to line breaks and strips stray backslashes.
///
/// The output holds no backslashes, so the function is idempotent.
pub fn sanitize_text(raw: &str) -> String {
    ESCAPED_LINE_BREAK.replace_all(raw, "\n").replace('\\', "")
}

//=========================================================================================
// Calendar
//=========================================================================================

/// Normalizes the reply to a calendar read.
///
/// A failed transport whose error body is itself a calendar list is taken as a
/// successful read: the calendar endpoint is known to answer through its error
/// channel with valid data.
pub fn normalize_calendar_read(reply: RemoteReply) -> CoreResult<CalendarSnapshot> {
    if reply.is_success() {
        return snapshot_from(reply.payload);
    }
    match error_body_as_calendar(&reply.payload) {
        Some(snapshot) => {
            warn!(
                status = reply.status,
                entries = snapshot.len(),
                "Calendar read failed at transport level but carried a calendar list; accepting it."
            );
            Ok(snapshot)
        }
        None => Err(server_failure(&reply)),
    }
}

/// Normalizes the reply to a calendar write, which is either a bare
/// acknowledgement or the full updated list.
pub fn normalize_calendar_write(reply: RemoteReply) -> CoreResult<Normalized> {
    if !reply.is_success() {
        return match error_body_as_calendar(&reply.payload) {
            Some(snapshot) => {
                warn!(
                    status = reply.status,
                    entries = snapshot.len(),
                    "Calendar write failed at transport level but carried a calendar list; accepting it."
                );
                Ok(Normalized::Calendar(snapshot))
            }
            None => Err(server_failure(&reply)),
        };
    }

    let decoded = match reply.payload {
        Value::String(text) if !looks_encoded(&text) => return Ok(Normalized::Acknowledged),
        other => decode(other)?,
    };
    if is_list_shaped(&decoded) {
        return snapshot_from(decoded).map(Normalized::Calendar);
    }
    if explicitly_declined(&decoded) {
        return Err(CoreError::new(
            ErrorKind::Rollback,
            "The calendar declined the change",
        ));
    }
    Ok(Normalized::Acknowledged)
}

/// Parses a calendar day. Accepts `YYYY-MM-DD` and RFC 3339 timestamps.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.len() == 10 {
        return NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok();
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|timestamp| timestamp.date_naive())
}

fn snapshot_from(payload: Value) -> CoreResult<CalendarSnapshot> {
    let posts = calendar_entries(payload)?
        .iter()
        .map(parse_entry)
        .collect::<CoreResult<Vec<_>>>()?;
    Ok(CalendarSnapshot::new(posts))
}

fn calendar_entries(payload: Value) -> CoreResult<Vec<Map<String, Value>>> {
    match decode(payload)? {
        Value::Object(mut record) => match record.remove("calendar_list") {
            Some(inner) => calendar_entries(inner),
            None => Err(unexpected_shape("a calendar list", &Value::Object(record))),
        },
        Value::Array(mut items) => {
            if items.len() == 1 && items[0].get("calendar_list").is_some() {
                return calendar_entries(items.remove(0));
            }
            items
                .into_iter()
                .map(|item| match decode(item)? {
                    Value::Object(record) => Ok(record),
                    other => Err(unexpected_shape("a calendar entry", &other)),
                })
                .collect()
        }
        other => Err(unexpected_shape("a calendar list", &other)),
    }
}

fn parse_entry(record: &Map<String, Value>) -> CoreResult<ScheduledPost> {
    let raw_date = record.get("date").ok_or_else(|| missing_field("date"))?;
    let raw_text = match raw_date {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    // Unparsable dates are kept with a fallback label rather than dropped.
    let (date, date_label) = match parse_calendar_date(&raw_text) {
        Some(date) => (Some(date), date.format("%Y-%m-%d").to_string()),
        None if raw_text.is_empty() => (None, "Unscheduled".to_string()),
        None => (None, format!("Unscheduled ({raw_text})")),
    };

    let text_field = |key: &str| {
        record
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let image_url = record
        .get("image_url")
        .or_else(|| record.get("imageUrl"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string);
    let status = record
        .get("status")
        .and_then(Value::as_str)
        .map(PostStatus::from_label)
        .unwrap_or(PostStatus::Planned);

    Ok(ScheduledPost {
        date,
        date_label,
        title: text_field("title"),
        content: sanitize_text(&text_field("content")),
        image_url,
        status,
        pending: None,
    })
}

/// An error body counts as a calendar list only when it is wrapped under
/// `calendar_list` or is a non-empty list of date-bearing records.
fn error_body_as_calendar(payload: &Value) -> Option<CalendarSnapshot> {
    let decoded = decode(payload.clone()).ok()?;
    let wrapped = match &decoded {
        Value::Object(record) => record.contains_key("calendar_list"),
        Value::Array(items) => items.len() == 1 && items[0].get("calendar_list").is_some(),
        _ => false,
    };
    let snapshot = snapshot_from(decoded).ok()?;
    (wrapped || !snapshot.is_empty()).then_some(snapshot)
}

fn is_list_shaped(value: &Value) -> bool {
    match value {
        Value::Object(record) => record.contains_key("calendar_list"),
        Value::Array(items) => items.iter().all(|item| item.get("date").is_some()),
        _ => false,
    }
}

//=========================================================================================
// Shared helpers
//=========================================================================================

fn looks_encoded(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}

/// Decodes text that looks like encoded JSON; other values pass through.
fn decode(value: Value) -> CoreResult<Value> {
    match value {
        Value::String(text) if looks_encoded(&text) => {
            serde_json::from_str(text.trim()).map_err(|e| {
                CoreError::new(
                    ErrorKind::MalformedResponse,
                    format!("Could not decode the server response: {e}"),
                )
            })
        }
        other => Ok(other),
    }
}

/// Decodes the payload, takes the first element of a list and requires a record.
fn unwrap_record(payload: Value) -> CoreResult<Map<String, Value>> {
    let value = match decode(payload)? {
        Value::Array(items) => {
            let first = items.into_iter().next().ok_or_else(|| {
                CoreError::new(
                    ErrorKind::UnexpectedShape,
                    "Expected a record but the server returned an empty list",
                )
            })?;
            decode(first)?
        }
        other => other,
    };
    match value {
        Value::Object(record) => Ok(record),
        other => Err(unexpected_shape("a record", &other)),
    }
}

fn read_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn explicitly_declined(payload: &Value) -> bool {
    let Ok(decoded) = decode(payload.clone()) else {
        return false;
    };
    let record = match &decoded {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    record
        .and_then(|r| r.get("success"))
        .and_then(read_flag)
        .is_some_and(|success| !success)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "plain text",
        Value::Array(_) => "a list",
        Value::Object(_) => "a record",
    }
}

fn unexpected_shape(expected: &str, found: &Value) -> CoreError {
    CoreError::new(
        ErrorKind::UnexpectedShape,
        format!("Expected {expected} but the server returned {}", describe(found)),
    )
}

fn missing_field(field: &str) -> CoreError {
    CoreError::new(
        ErrorKind::MissingField,
        format!("The server response is missing `{field}`"),
    )
}

fn server_failure(reply: &RemoteReply) -> CoreError {
    let detail = match &reply.payload {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Object(record) => record
            .get("message")
            .or_else(|| record.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };
    let message = match detail {
        Some(detail) => format!("Server responded with status {}: {detail}", reply.status),
        None => format!("Server responded with status {}", reply.status),
    };
    CoreError::new(ErrorKind::ServerFailure, message)
}
