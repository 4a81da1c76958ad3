// Crossing Browser - query, pagination and export client for vehicle crossing records
//
// The library covers:
// - Filter sets and request construction
// - Paged browsing that never regresses to a stale response
// - Streaming exports of the full filtered set to a local file

// Timing macros - must come first so every module below can use them
#[macro_use]
mod macros;

pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod pagination;
pub mod query;
pub mod session;

pub use client::DataClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, ErrorKind, Result};
pub use export::{ExportError, ExportJob, ExportProgress, ExportState};
pub use models::{CrossingEvent, ExportFormat, FilterVocabulary, Record, ResultPage};
pub use pagination::{FetchOutcome, PageView, PaginationController};
pub use query::{DateRange, FilterField, FilterSet, PageSize, RequestDescriptor};
pub use session::BrowserSession;

/// Initialize env_logger to output to stderr (reads RUST_LOG env var).
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
