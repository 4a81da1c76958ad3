// Query layer - filter values and canonical request descriptors

pub mod builder;
pub mod filters;

pub use builder::{
    build, format_timestamp, ExportQuery, PageSize, QueryPairs, RequestDescriptor, SORT_KEY,
};
pub use filters::{DateRange, FilterField, FilterSet};
