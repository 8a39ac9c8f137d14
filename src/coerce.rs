// ABOUTME: Bidirectional mapping between native column values and JSON-safe scalars
// ABOUTME: Encode runs during export, decode dispatches on the target column's type family

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde_json::Value as JsonValue;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

/// Vendor-neutral classification of a column's native type.
///
/// Both engines map their own type names onto this set; the decode direction
/// dispatches on the *target* column's family, so the source and target
/// engines are free to disagree on concrete types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Boolean,
    Integer,
    Float,
    Decimal,
    /// Timestamp without zone information.
    Timestamp,
    /// Timestamp carrying a zone or offset.
    TimestampTz,
    Date,
    Time,
    Text,
    Bytes,
    /// Anything else; values pass through and the driver coerces.
    Other,
}

impl TypeFamily {
    /// Stable code written into the manifest's column metadata.
    pub fn code(self) -> &'static str {
        match self {
            TypeFamily::Boolean => "boolean",
            TypeFamily::Integer => "integer",
            TypeFamily::Float => "float",
            TypeFamily::Decimal => "decimal",
            TypeFamily::Timestamp => "timestamp",
            TypeFamily::TimestampTz => "timestamptz",
            TypeFamily::Date => "date",
            TypeFamily::Time => "time",
            TypeFamily::Text => "text",
            TypeFamily::Bytes => "bytes",
            TypeFamily::Other => "other",
        }
    }
}

/// A decoded native value ready to be bound to a parameterized INSERT.
///
/// Each engine implements its driver's binding trait for this enum, so the
/// importer stays engine-agnostic.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Exact decimal text; never routed through a binary float.
    Decimal(String),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
}

// ---------------------------------------------------------------------------
// Encode: native -> JSON-safe
// ---------------------------------------------------------------------------

/// Byte sequences travel as standard base64.
pub fn encode_bytes(bytes: &[u8]) -> JsonValue {
    JsonValue::String(BASE64.encode(bytes))
}

/// Floats become JSON numbers; non-finite values fall back to their string
/// form, which the float decoder parses back.
pub fn encode_f64(value: f64) -> JsonValue {
    match serde_json::Number::from_f64(value) {
        Some(n) => JsonValue::Number(n),
        None => JsonValue::String(value.to_string()),
    }
}

/// ISO-8601 local date-time, fractional seconds only when present.
pub fn format_naive_datetime(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// ISO-8601 instant with Z suffix.
pub fn format_datetime_utc(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn format_date(value: &NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub fn format_time(value: &NaiveTime) -> String {
    value.format("%H:%M:%S%.f").to_string()
}

// ---------------------------------------------------------------------------
// Decode: JSON-safe + target type family -> native
// ---------------------------------------------------------------------------

/// Coerce a JSON scalar to the target column's native value.
///
/// A JSON null maps to SQL NULL regardless of declared nullability; the
/// database enforces NOT NULL and a violation surfaces as an insert failure,
/// never a silent default.
///
/// # Errors
///
/// Returns a human-readable reason when the value cannot be represented in
/// the target family (the importer attaches table/column context).
pub fn decode(raw: &JsonValue, family: TypeFamily) -> Result<SqlValue, String> {
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }

    match family {
        TypeFamily::Boolean => Ok(SqlValue::Bool(decode_bool(raw))),
        TypeFamily::Integer => decode_integer(raw).map(SqlValue::Int),
        TypeFamily::Float => decode_float(raw).map(SqlValue::Float),
        TypeFamily::Decimal => decode_decimal(raw).map(SqlValue::Decimal),
        TypeFamily::Timestamp => {
            decode_instant(raw).map(|dt| SqlValue::Timestamp(dt.naive_utc()))
        }
        TypeFamily::TimestampTz => decode_instant(raw).map(SqlValue::TimestampTz),
        TypeFamily::Date => decode_date(raw).map(SqlValue::Date),
        TypeFamily::Time => decode_time(raw).map(SqlValue::Time),
        TypeFamily::Text => Ok(SqlValue::Text(scalar_to_string(raw))),
        TypeFamily::Bytes => decode_bytes(raw),
        TypeFamily::Other => Ok(passthrough(raw)),
    }
}

fn decode_bool(raw: &JsonValue) -> bool {
    match raw {
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        JsonValue::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "t" | "1" | "yes" | "y"
        ),
        _ => false,
    }
}

fn decode_integer(raw: &JsonValue) -> Result<i64, String> {
    match raw {
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(f) = n.as_f64() {
                Ok(f.trunc() as i64)
            } else {
                Err(format!("number {} is out of integer range", n))
            }
        }
        JsonValue::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .or_else(|_| s.parse::<f64>().map(|f| f.trunc() as i64))
                .map_err(|_| format!("\"{}\" is not an integer", s))
        }
        other => Err(format!("{} is not an integer", other)),
    }
}

fn decode_float(raw: &JsonValue) -> Result<f64, String> {
    match raw {
        JsonValue::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("number {} is not representable as a float", n)),
        JsonValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("\"{}\" is not a number", s.trim())),
        other => Err(format!("{} is not a number", other)),
    }
}

fn decode_decimal(raw: &JsonValue) -> Result<String, String> {
    match raw {
        // serde_json renders the exact digits it was given.
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::String(s) => {
            let s = s.trim();
            // Validity check only; the text itself is what gets bound.
            s.parse::<f64>()
                .map(|_| s.to_string())
                .map_err(|_| format!("\"{}\" is not a decimal number", s))
        }
        other => Err(format!("{} is not a decimal number", other)),
    }
}

fn decode_instant(raw: &JsonValue) -> Result<DateTime<Utc>, String> {
    match raw {
        JsonValue::Number(n) => {
            let millis = n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(|| format!("number {} is out of timestamp range", n))?;
            DateTime::from_timestamp_millis(millis)
                .ok_or_else(|| format!("epoch millis {} is out of timestamp range", millis))
        }
        JsonValue::String(s) => parse_timestamp_str(s.trim()),
        other => Err(format!("{} is not a timestamp", other)),
    }
}

fn parse_timestamp_str(s: &str) -> Result<DateTime<Utc>, String> {
    // (a) ISO-8601 instant with zone/offset suffix.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // (b) ISO-8601 local date-time; treated as UTC.
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.and_utc());
        }
    }
    Err(format!("\"{}\" is not an ISO-8601 timestamp", s))
}

fn decode_date(raw: &JsonValue) -> Result<NaiveDate, String> {
    match raw {
        JsonValue::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| format!("\"{}\" is not an ISO-8601 date", s.trim())),
        // Dates also accept a full timestamp and keep the day part.
        JsonValue::Number(_) => decode_instant(raw).map(|dt| dt.date_naive()),
        other => Err(format!("{} is not a date", other)),
    }
}

fn decode_time(raw: &JsonValue) -> Result<NaiveTime, String> {
    match raw {
        JsonValue::String(s) => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
            .map_err(|_| format!("\"{}\" is not an ISO-8601 time", s.trim())),
        other => Err(format!("{} is not a time", other)),
    }
}

fn decode_bytes(raw: &JsonValue) -> Result<SqlValue, String> {
    match raw {
        JsonValue::String(s) => BASE64
            .decode(s.as_bytes())
            .map(SqlValue::Bytes)
            .map_err(|e| format!("invalid base64: {}", e)),
        other => Err(format!("{} is not a base64 byte string", other)),
    }
}

fn scalar_to_string(raw: &JsonValue) -> String {
    match raw {
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn passthrough(raw: &JsonValue) -> SqlValue {
    match raw {
        JsonValue::Bool(b) => SqlValue::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Int(i),
            None => SqlValue::Float(n.as_f64().unwrap_or(0.0)),
        },
        JsonValue::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}
