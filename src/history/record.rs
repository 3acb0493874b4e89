//! One logged tutoring exchange and its per-field validation rules.
//!
//! Lines of the history log are decoded into a JSON object first and then
//! checked field by field. Every rule returns a tagged [`SchemaError`] instead
//! of panicking, so a bad line can be dropped without aborting the pass.

use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Field names as they appear on disk.
pub mod fields {
    #![allow(missing_docs)]
    pub const TIMESTAMP: &str = "timestamp";
    pub const QUERY: &str = "query";
    pub const RESPONSE: &str = "response";
    pub const RESPONSE_LENGTH: &str = "response_length";
    pub const MODEL: &str = "model";
    pub const SESSION_DURATION: &str = "session_duration";
}

/// Timestamp layout written for new records (local time, microseconds).
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// What was wrong with a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaViolation {
    /// Required key absent.
    Missing,
    /// Required key present as `null`.
    Null,
    /// Value of the wrong JSON type.
    WrongType {
        /// Human-readable name of the accepted type.
        expected: &'static str,
    },
    /// Empty string where content is required.
    Empty,
    /// Number below zero.
    Negative,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("missing"),
            Self::Null => f.write_str("null"),
            Self::WrongType { expected } => write!(f, "expected {expected}"),
            Self::Empty => f.write_str("empty"),
            Self::Negative => f.write_str("negative"),
        }
    }
}

/// A structurally valid line whose fields break the record schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field `{field}` {violation}")]
pub struct SchemaError {
    /// On-disk name of the offending field.
    pub field: &'static str,
    /// What was wrong with it.
    pub violation: SchemaViolation,
}

/// Why a single history line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    /// Not a JSON object.
    #[error("parse error: {0}")]
    Parse(String),
    /// A JSON object that is not a valid record.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// One logged query/response exchange. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionRecord {
    timestamp: String,
    query: String,
    response: String,
    response_length: u64,
    model: String,
    /// Kept as decoded so integral minutes are written back as integers.
    session_duration: Option<Number>,
}

impl InteractionRecord {
    /// Create a record for an exchange that just happened, stamped with the
    /// local time. `response_length` is the response's character count.
    pub fn new(
        query: impl Into<String>,
        response: impl Into<String>,
        model: impl Into<String>,
        session_duration: Option<f64>,
    ) -> Self {
        let response = response.into();
        let response_length = response.chars().count() as u64;
        Self {
            timestamp: Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string(),
            query: query.into(),
            response,
            response_length,
            model: model.into(),
            session_duration: session_duration.and_then(Number::from_f64),
        }
    }

    /// Decode and validate one log line.
    pub fn from_line(line: &str) -> Result<Self, LineError> {
        let value: Value =
            serde_json::from_str(line).map_err(|e| LineError::Parse(e.to_string()))?;
        let Value::Object(map) = value else {
            return Err(LineError::Parse(format!(
                "expected a JSON object, found {}",
                json_kind(&value)
            )));
        };
        Ok(Self::from_raw(&map)?)
    }

    /// Build a record from a decoded key/value map. Unknown keys are ignored.
    pub fn from_raw(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        let query = required_str(raw, fields::QUERY)?;
        if query.is_empty() {
            return Err(SchemaError {
                field: fields::QUERY,
                violation: SchemaViolation::Empty,
            });
        }
        Ok(Self {
            timestamp: required_str(raw, fields::TIMESTAMP)?,
            query,
            response: required_str(raw, fields::RESPONSE)?,
            response_length: required_count(raw, fields::RESPONSE_LENGTH)?,
            model: required_str(raw, fields::MODEL)?,
            session_duration: optional_minutes(raw, fields::SESSION_DURATION)?,
        })
    }

    /// Deterministic inverse of [`Self::from_raw`]; an absent duration is
    /// written as `null`.
    pub fn to_raw(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(fields::TIMESTAMP.into(), Value::from(self.timestamp.clone()));
        map.insert(fields::QUERY.into(), Value::from(self.query.clone()));
        map.insert(fields::RESPONSE.into(), Value::from(self.response.clone()));
        map.insert(
            fields::RESPONSE_LENGTH.into(),
            Value::from(self.response_length),
        );
        map.insert(fields::MODEL.into(), Value::from(self.model.clone()));
        map.insert(
            fields::SESSION_DURATION.into(),
            self.session_duration
                .clone()
                .map_or(Value::Null, Value::Number),
        );
        map
    }

    /// Serialize as one JSONL line, without the trailing newline.
    pub fn to_line(&self) -> String {
        Value::Object(self.to_raw()).to_string()
    }

    /// Timestamp exactly as logged.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// The student's question.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The tutor's answer.
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Character count of the response as logged.
    pub fn response_length(&self) -> u64 {
        self.response_length
    }

    /// Model identifier that produced the response.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Minutes since session start when this record was logged.
    pub fn session_duration(&self) -> Option<f64> {
        self.session_duration.as_ref().and_then(Number::as_f64)
    }

    /// Calendar date of the timestamp as written (no timezone conversion).
    ///
    /// Accepts naive ISO-8601 (`2024-01-01T10:00:00[.ffffff]`, `T` or space
    /// separated), RFC 3339 with an offset, and bare dates.
    pub fn date(&self) -> Option<NaiveDate> {
        let ts = self.timestamp.trim();
        for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(ts, layout) {
                return Some(dt.date());
            }
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
            return Some(dt.naive_local().date());
        }
        NaiveDate::parse_from_str(ts, "%Y-%m-%d").ok()
    }
}

fn field<'a>(raw: &'a Map<String, Value>, name: &'static str) -> Result<&'a Value, SchemaError> {
    match raw.get(name) {
        None => Err(SchemaError {
            field: name,
            violation: SchemaViolation::Missing,
        }),
        Some(Value::Null) => Err(SchemaError {
            field: name,
            violation: SchemaViolation::Null,
        }),
        Some(value) => Ok(value),
    }
}

fn required_str(raw: &Map<String, Value>, name: &'static str) -> Result<String, SchemaError> {
    field(raw, name)?
        .as_str()
        .map(ToString::to_string)
        .ok_or(SchemaError {
            field: name,
            violation: SchemaViolation::WrongType { expected: "string" },
        })
}

fn required_count(raw: &Map<String, Value>, name: &'static str) -> Result<u64, SchemaError> {
    let value = field(raw, name)?;
    if let Some(n) = value.as_u64() {
        return Ok(n);
    }
    let violation = if value.as_i64().is_some() {
        SchemaViolation::Negative
    } else {
        SchemaViolation::WrongType {
            expected: "non-negative integer",
        }
    };
    Err(SchemaError {
        field: name,
        violation,
    })
}

fn optional_minutes(
    raw: &Map<String, Value>,
    name: &'static str,
) -> Result<Option<Number>, SchemaError> {
    match raw.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(minutes) if minutes < 0.0 => Err(SchemaError {
                field: name,
                violation: SchemaViolation::Negative,
            }),
            Some(_) => Ok(Some(n.clone())),
            None => Err(SchemaError {
                field: name,
                violation: SchemaViolation::WrongType { expected: "number" },
            }),
        },
        Some(_) => Err(SchemaError {
            field: name,
            violation: SchemaViolation::WrongType { expected: "number" },
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
