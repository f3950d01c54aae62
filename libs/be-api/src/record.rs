use serde::Serialize;
use serde_json::{Map, Value};

/// One JSON object from the feed.
///
/// Fields keep their wire order. A `Record` is immutable once decoded: sinks
/// only ever see `&Record` and must `clone()` if they want to keep it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

/// Why a unit of bytes could not become a `Record`.
#[derive(Debug)]
pub enum RecordError {
    /// Not valid JSON (or not valid UTF-8).
    Json(serde_json::Error),
    /// Valid JSON, but an array, string, number, bool or null.
    NotAnObject(&'static str),
    /// `{}`: carries nothing to dispatch.
    Empty,
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::Json(e) => write!(f, "invalid json: {e}"),
            RecordError::NotAnObject(kind) => write!(f, "expected a json object, got {kind}"),
            RecordError::Empty => f.write_str("empty object"),
        }
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl Record {
    /// Parse one framed unit.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_slice(bytes).map_err(RecordError::Json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        match value {
            Value::Object(map) if map.is_empty() => Err(RecordError::Empty),
            Value::Object(map) => Ok(Self(map)),
            Value::Array(_) => Err(RecordError::NotAnObject("array")),
            Value::String(_) => Err(RecordError::NotAnObject("string")),
            Value::Number(_) => Err(RecordError::NotAnObject("number")),
            Value::Bool(_) => Err(RecordError::NotAnObject("bool")),
            Value::Null => Err(RecordError::NotAnObject("null")),
        }
    }

    /// Resolve a dot-separated path (`"origin.job_id"`) through nested objects.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Projection of `origin.job_id`, if present and a string.
    pub fn job_origin(&self) -> Option<JobOrigin<'_>> {
        self.lookup("origin.job_id")
            .and_then(Value::as_str)
            .map(|job_id| JobOrigin { job_id })
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Borrowed view of the job a record was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOrigin<'a> {
    pub job_id: &'a str,
}
