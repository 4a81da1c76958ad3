// Models - Crossing records
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::wire;

/// One paired crossing: an entry observation and, once seen, its exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(deserialize_with = "wire::id")]
    pub insertion_id: i64,
    #[serde(default, deserialize_with = "wire::text")]
    pub license_plate: String,
    #[serde(default, deserialize_with = "wire::text")]
    pub category: String,
    #[serde(default, deserialize_with = "wire::text")]
    pub color: String,
    #[serde(deserialize_with = "wire::timestamp")]
    pub entry_timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "wire::text")]
    pub entry_gate: String,
    #[serde(default, deserialize_with = "wire::optional_timestamp")]
    pub exit_timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "wire::optional_text")]
    pub exit_gate: Option<String>,
    #[serde(default, deserialize_with = "wire::text")]
    pub zone: String,
    #[serde(default, deserialize_with = "wire::text")]
    pub description: String,
    #[serde(
        default,
        deserialize_with = "wire::optional_seconds",
        serialize_with = "wire::serialize_seconds"
    )]
    pub duration: Option<Duration>,
    #[serde(default, rename = "insertion_id_exit", deserialize_with = "wire::optional_id")]
    pub exit_insertion_id: Option<i64>,
}

/// Whether a crossing has been closed by an exit observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossingState {
    Open,
    Closed,
}

impl Record {
    pub fn state(&self) -> CrossingState {
        if self.exit_timestamp.is_some() {
            CrossingState::Closed
        } else {
            CrossingState::Open
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == CrossingState::Open
    }
}

/// Direction implied by the gate naming convention (`*_in` / `*_out`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Entry,
    Exit,
    Unknown,
}

/// A raw, unpaired observation as served by the dashboard feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossingEvent {
    #[serde(deserialize_with = "wire::id")]
    pub insertion_id: i64,
    #[serde(default, deserialize_with = "wire::text")]
    pub license_plate: String,
    #[serde(default, deserialize_with = "wire::text")]
    pub category: String,
    #[serde(default, deserialize_with = "wire::text")]
    pub color: String,
    #[serde(deserialize_with = "wire::timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, deserialize_with = "wire::text")]
    pub gate: String,
    #[serde(default, deserialize_with = "wire::text")]
    pub zone: String,
    #[serde(default, deserialize_with = "wire::text")]
    pub description: String,
}

impl CrossingEvent {
    pub fn direction(&self) -> Direction {
        if self.gate.ends_with("_in") {
            Direction::Entry
        } else if self.gate.ends_with("_out") {
            Direction::Exit
        } else {
            Direction::Unknown
        }
    }
}
