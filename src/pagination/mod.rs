// Pagination - keeps one paged view consistent with the active filters

pub mod controller;
pub mod source;

pub use controller::{FetchOutcome, PageView, PaginationController};
pub use source::{DashboardFeed, PageSource, RecordsFeed};
