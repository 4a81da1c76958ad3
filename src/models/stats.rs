// Models - Server-computed statistics
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Single-number counters exposed under `/stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    Today,
    RecentEntries,
    RecentExits,
}

impl StatKind {
    pub fn path(&self) -> &'static str {
        match self {
            StatKind::Today => "/stats/today",
            StatKind::RecentEntries => "/stats/recent-entries",
            StatKind::RecentExits => "/stats/recent-exits",
        }
    }
}

/// `{count: int}` body shared by the counter endpoints
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CountBody {
    pub count: u64,
}

/// The three dashboard counters, fetched together
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveCounts {
    pub today: u64,
    pub recent_entries: u64,
    pub recent_exits: u64,
}

/// Window for the enhanced statistics endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsRange {
    All,
    Today,
    Week,
    Month,
    Custom {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl StatsRange {
    pub fn as_param(&self) -> &'static str {
        match self {
            StatsRange::All => "all",
            StatsRange::Today => "today",
            StatsRange::Week => "week",
            StatsRange::Month => "month",
            StatsRange::Custom { .. } => "custom",
        }
    }
}

/// Aggregates computed by the service for a time window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhancedStats {
    #[serde(default)]
    pub total_events: u64,
    #[serde(default)]
    pub busiest_hour: Option<u8>,
    #[serde(default)]
    pub category_counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub gate_usage: BTreeMap<String, u64>,
    /// Keyed by hour bucket as rendered by the server
    #[serde(default)]
    pub hourly_trend: BTreeMap<String, u64>,
    #[serde(default)]
    pub color_distribution: BTreeMap<String, u64>,
    #[serde(default)]
    pub zone_counts: BTreeMap<String, u64>,
}

impl EnhancedStats {
    /// Gate with the highest usage, if any gate was used
    pub fn most_used_gate(&self) -> Option<&str> {
        self.gate_usage
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(gate, _)| gate.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enhanced_stats_partial_body() {
        let stats: EnhancedStats = serde_json::from_str(
            r#"{"total_events": 12, "busiest_hour": null, "gate_usage": {"north_in": 7, "south_out": 5}}"#,
        )
        .unwrap();
        assert_eq!(stats.total_events, 12);
        assert_eq!(stats.busiest_hour, None);
        assert!(stats.category_counts.is_empty());
        assert_eq!(stats.most_used_gate(), Some("north_in"));
    }
}
