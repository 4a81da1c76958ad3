// Models - Re-exports all wire and domain types
//
// This module is split into focused files:
// - record.rs: paired crossing records and raw crossing events
// - page.rs: paged result envelope, filter vocabulary, export format
// - stats.rs: server-computed counters and statistics
// - wire.rs: lenient decoding of the service's loosely typed JSON

mod record;
mod page;
mod stats;
pub(crate) mod wire;

pub use record::{CrossingEvent, CrossingState, Direction, Record};
pub use page::{ExportFormat, FilterVocabulary, ResultPage};
pub use stats::{EnhancedStats, LiveCounts, StatKind, StatsRange};
pub(crate) use stats::CountBody;
