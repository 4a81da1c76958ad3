// Wire decoding helpers
//
// The tracking service serialises pandas frames, so ids may arrive as floats,
// missing text as null, and "no exit yet" as sentinels ("" / -1 / null).

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Number {
    fn as_i64(&self) -> Option<i64> {
        match self {
            Number::Int(v) => Some(*v),
            Number::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            Number::Float(_) => None,
            Number::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.fract() == 0.0)
                .map(|v| v as i64),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Number::Int(v) => Some(*v as f64),
            Number::Float(v) => Some(*v),
            Number::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

/// Parse the timestamp shapes the service emits.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nat") {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

pub fn id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Number::deserialize(deserializer)?;
    value
        .as_i64()
        .ok_or_else(|| D::Error::custom("expected an integral id"))
}

/// `-1` and null both mean "no exit event matched".
pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Number>::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(n) => match n.as_i64() {
            Some(v) if v >= 0 => Ok(Some(v)),
            Some(_) => Ok(None),
            None => Err(D::Error::custom("expected an integral id")),
        },
    }
}

pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

pub fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw)))
}

pub fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() || raw.trim().eq_ignore_ascii_case("nat") => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw))),
    }
}

/// Duration in seconds; negative values are the "still inside" sentinel.
pub fn optional_seconds<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Number>::deserialize(deserializer)?;
    match value.map(|n| n.as_f64()) {
        None => Ok(None),
        Some(Some(secs)) if secs.is_finite() && secs >= 0.0 => {
            Ok(Some(Duration::from_secs_f64(secs)))
        }
        Some(Some(_)) => Ok(None),
        Some(None) => Err(D::Error::custom("expected a duration in seconds")),
    }
}

pub fn serialize_seconds<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(d) => serializer.serialize_some(&d.as_secs_f64()),
        None => serializer.serialize_none(),
    }
}
