//! DataClient - typed access to the tracking service
//!
//! Every public operation is a single round trip (the vocabulary and live
//! counters fan out their requests concurrently). Nothing is retried; each
//! failure is classified and returned to the caller.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::transport::{HttpTransport, Transport, WireResponse};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::models::{
    CountBody, CrossingEvent, EnhancedStats, FilterVocabulary, LiveCounts, Record, ResultPage,
    StatKind, StatsRange,
};
use crate::query::{format_timestamp, ExportQuery, QueryPairs, RequestDescriptor};

/// Longest slice of an error body quoted in a `ServerRejected` detail
const MAX_ERROR_DETAIL: usize = 200;

/// `{data, total_pages, total_records}` envelope shared by the paged endpoints
#[derive(Debug, Deserialize)]
struct PageEnvelope<T> {
    data: Vec<T>,
    total_pages: u64,
    total_records: u64,
}

/// Only the totals of a paged envelope; rows are skipped, not decoded
#[derive(Debug, Deserialize)]
struct TotalsEnvelope {
    total_records: u64,
}

pub struct DataClient {
    transport: Arc<dyn Transport>,
    vocabulary: OnceCell<FilterVocabulary>,
}

impl DataClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(config)?)))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            vocabulary: OnceCell::new(),
        }
    }

    /// One page of paired crossing records.
    pub async fn fetch_page(&self, descriptor: &RequestDescriptor) -> Result<ResultPage<Record>> {
        let envelope: PageEnvelope<Record> =
            self.get_json("/data", descriptor.query_pairs()).await?;
        into_page(envelope, descriptor)
    }

    /// One page of raw events from the dashboard feed (search only).
    pub async fn fetch_dashboard_page(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<ResultPage<CrossingEvent>> {
        let envelope: PageEnvelope<CrossingEvent> =
            self.get_json("/dashboard/data", descriptor.dashboard_pairs()).await?;
        into_page(envelope, descriptor)
    }

    /// Number of records matching the descriptor's filters.
    pub async fn fetch_count(&self, descriptor: &RequestDescriptor) -> Result<u64> {
        let totals: TotalsEnvelope = self.get_json("/data", descriptor.count_pairs()).await?;
        Ok(totals.total_records)
    }

    pub async fn fetch_record(&self, insertion_id: i64) -> Result<Record> {
        self.get_json(&format!("/data/{}", insertion_id), QueryPairs::new()).await
    }

    /// Distinct categories, colors and gates; cached after the first success.
    pub async fn fetch_filter_vocabulary(&self) -> Result<FilterVocabulary> {
        self.vocabulary
            .get_or_try_init(|| self.load_vocabulary())
            .await
            .cloned()
    }

    pub async fn fetch_stat(&self, kind: StatKind) -> Result<u64> {
        let body: CountBody = self.get_json(kind.path(), QueryPairs::new()).await?;
        Ok(body.count)
    }

    pub async fn fetch_live_counts(&self) -> Result<LiveCounts> {
        let (today, recent_entries, recent_exits) = tokio::try_join!(
            self.fetch_stat(StatKind::Today),
            self.fetch_stat(StatKind::RecentEntries),
            self.fetch_stat(StatKind::RecentExits),
        )?;
        Ok(LiveCounts {
            today,
            recent_entries,
            recent_exits,
        })
    }

    pub async fn fetch_enhanced_stats(&self, range: StatsRange) -> Result<EnhancedStats> {
        let mut query: QueryPairs = vec![("time_range", range.as_param().to_string())];
        if let StatsRange::Custom { start, end } = range {
            query.push(("start_date", format_timestamp(&start)));
            query.push(("end_date", format_timestamp(&end)));
        }
        self.get_json("/stats/enhanced-stats", query).await
    }

    /// Start an export transfer; the body is left unread for streaming.
    pub async fn open_export(&self, export: &ExportQuery) -> Result<WireResponse> {
        let response = self.transport.get("/export", &export.query_pairs()).await?;
        if !response.is_success() {
            return Err(rejection(response).await);
        }
        Ok(response)
    }

    async fn load_vocabulary(&self) -> Result<FilterVocabulary> {
        let (categories, colors, gates) = tokio::try_join!(
            self.fetch_values("/filters/categories", "categories"),
            self.fetch_values("/filters/colors", "colors"),
            self.fetch_values("/filters/gates", "gates"),
        )?;
        log::info!(
            "Loaded filter vocabulary: {} categories, {} colors, {} gates",
            categories.len(),
            colors.len(),
            gates.len()
        );
        Ok(FilterVocabulary {
            categories,
            colors,
            gates,
        })
    }

    async fn fetch_values(&self, path: &str, key: &str) -> Result<Vec<String>> {
        let mut body: HashMap<String, Vec<Option<String>>> =
            self.get_json(path, QueryPairs::new()).await?;
        let values = body
            .remove(key)
            .ok_or_else(|| {
                ClientError::MalformedResponse(format!("{} response has no '{}' list", path, key))
            })?;
        Ok(values
            .into_iter()
            .flatten()
            .filter(|v| !v.trim().is_empty())
            .collect())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: QueryPairs) -> Result<T> {
        let response = timed!(format!("GET {}", path), self.transport.get(path, &query))?;

        if !response.is_success() {
            let err = rejection(response).await;
            log::warn!("GET {} failed: {}", path, err);
            return Err(err);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| {
                ClientError::Unreachable(format!("Failed to read response from {}: {}", path, e))
            })?;

        serde_json::from_slice(&body).map_err(|e| {
            log::warn!("GET {} returned an unexpected body: {}", path, e);
            ClientError::MalformedResponse(format!("{}: {}", path, e))
        })
    }
}

/// Turn a non-2xx response into `ServerRejected`, quoting the body if readable.
async fn rejection(response: WireResponse) -> ClientError {
    let status = response.status;
    let detail = match response.bytes().await {
        Ok(body) => {
            let text = String::from_utf8_lossy(&body);
            text.chars().take(MAX_ERROR_DETAIL).collect()
        }
        Err(_) => String::new(),
    };
    ClientError::ServerRejected { status, detail }
}

fn into_page<T>(
    envelope: PageEnvelope<T>,
    descriptor: &RequestDescriptor,
) -> Result<ResultPage<T>> {
    let rows = envelope.data.len() as u64;
    if rows > u64::from(descriptor.page_size().get()) {
        return Err(ClientError::MalformedResponse(format!(
            "page holds {} rows but page size is {}",
            rows,
            descriptor.page_size()
        )));
    }
    if envelope.total_records < rows {
        return Err(ClientError::MalformedResponse(format!(
            "total_records {} is less than the {} rows returned",
            envelope.total_records, rows
        )));
    }
    Ok(ResultPage {
        rows: envelope.data,
        total_pages: envelope.total_pages,
        total_records: envelope.total_records,
    })
}
