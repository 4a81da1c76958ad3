//! Canonical request construction
//!
//! [`build`] is pure: the same filters and cursor always yield an equal
//! [`RequestDescriptor`], and an equal descriptor always renders the same
//! query string. Empty filter dimensions never reach the wire.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::filters::{FilterField, FilterSet};
use crate::models::ExportFormat;

/// Ordering applied by the service to every records query
pub const SORT_KEY: &str = "timestamp desc";

/// Query pairs in rendering order
pub type QueryPairs = Vec<(&'static str, String)>;

/// Page sizes offered by the browser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PageSize {
    #[default]
    Ten,
    TwentyFive,
    Fifty,
    Hundred,
}

impl PageSize {
    pub const ALL: [PageSize; 4] = [
        PageSize::Ten,
        PageSize::TwentyFive,
        PageSize::Fifty,
        PageSize::Hundred,
    ];

    pub fn get(&self) -> u32 {
        match self {
            PageSize::Ten => 10,
            PageSize::TwentyFive => 25,
            PageSize::Fifty => 50,
            PageSize::Hundred => 100,
        }
    }
}

impl TryFrom<u32> for PageSize {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        PageSize::ALL
            .into_iter()
            .find(|size| size.get() == value)
            .ok_or_else(|| format!("Unsupported page size {} (expected 10, 25, 50 or 100)", value))
    }
}

impl From<PageSize> for u32 {
    fn from(size: PageSize) -> Self {
        size.get()
    }
}

impl std::fmt::Display for PageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// A fully specified records request; equal values are equal requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestDescriptor {
    page: u32,
    page_size: PageSize,
    filters: FilterSet,
}

/// Build the descriptor for `filters` at `page` (floored to 1).
pub fn build(filters: &FilterSet, page: u32, page_size: PageSize) -> RequestDescriptor {
    RequestDescriptor {
        page: page.max(1),
        page_size,
        filters: filters.clone(),
    }
}

impl RequestDescriptor {
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn sort_key(&self) -> &'static str {
        SORT_KEY
    }

    /// Wire form for `GET /data`
    pub fn query_pairs(&self) -> QueryPairs {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.get().to_string()),
        ];
        push_filters(&mut pairs, &self.filters, &RECORD_PARAMS);
        pairs
    }

    /// Wire form for `GET /dashboard/data`, which only understands search
    pub fn dashboard_pairs(&self) -> QueryPairs {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.get().to_string()),
        ];
        if let Some(term) = self.filters.effective_search() {
            pairs.push(("search", term.to_string()));
        }
        pairs
    }

    /// Smallest `/data` request whose envelope still reports `total_records`.
    pub fn count_pairs(&self) -> QueryPairs {
        let mut pairs = vec![("page", "1".to_string()), ("page_size", "1".to_string())];
        push_filters(&mut pairs, &self.filters, &RECORD_PARAMS);
        pairs
    }
}

/// Unpaginated export of everything matching a filter set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExportQuery {
    filters: FilterSet,
    format: ExportFormat,
}

impl ExportQuery {
    pub fn new(filters: &FilterSet, format: ExportFormat) -> Self {
        Self {
            filters: filters.clone(),
            format,
        }
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Wire form for `GET /export` (plural multi-value parameter names)
    pub fn query_pairs(&self) -> QueryPairs {
        let mut pairs = QueryPairs::new();
        push_filters(&mut pairs, &self.filters, &EXPORT_PARAMS);
        pairs.push(("file_format", self.format.as_param().to_string()));
        pairs
    }
}

/// Parameter names for one endpoint family
struct ParamNames {
    license_prefix: &'static str,
    category: &'static str,
    color: &'static str,
    gate: &'static str,
}

const RECORD_PARAMS: ParamNames = ParamNames {
    license_prefix: "license_prefix",
    category: "category",
    color: "color",
    gate: "gate",
};

const EXPORT_PARAMS: ParamNames = ParamNames {
    license_prefix: "license_prefix",
    category: "categories",
    color: "colors",
    gate: "gates",
};

impl ParamNames {
    fn name(&self, field: FilterField) -> &'static str {
        match field {
            FilterField::LicensePrefix => self.license_prefix,
            FilterField::Category => self.category,
            FilterField::Color => self.color,
            FilterField::Gate => self.gate,
        }
    }
}

/// Fixed UTC rendering used for every date parameter
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn push_filters(pairs: &mut QueryPairs, filters: &FilterSet, names: &ParamNames) {
    if let Some(term) = filters.effective_search() {
        pairs.push(("search", term.to_string()));
    }
    let range = filters.date_range();
    if let Some(start) = range.start() {
        pairs.push(("start_date", format_timestamp(&start)));
    }
    if let Some(end) = range.end() {
        pairs.push(("end_date", format_timestamp(&end)));
    }
    for field in FilterField::ALL {
        let values = filters.values(field);
        if !values.is_empty() {
            let joined = values.iter().map(String::as_str).collect::<Vec<_>>().join(",");
            pairs.push((names.name(field), joined));
        }
    }
}
