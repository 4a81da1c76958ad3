//! Browser session
//!
//! Ties the record view and the (optional) export dialog to one set of
//! filters. A filter change is pushed to both explicitly; the export count
//! and the visible page are refreshed concurrently.

use std::path::PathBuf;
use std::sync::Arc;

use crate::client::DataClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::export::ExportJob;
use crate::models::{ExportFormat, FilterVocabulary, Record};
use crate::pagination::{FetchOutcome, PageView, PaginationController, RecordsFeed};
use crate::query::FilterSet;

/// What a filter change did to each consumer
#[derive(Debug)]
pub struct FilterUpdate {
    pub page: Result<FetchOutcome>,
    /// `None` when no export dialog is open
    pub export_count: Option<Result<u64>>,
}

pub struct BrowserSession {
    client: Arc<DataClient>,
    records: PaginationController<RecordsFeed>,
    export: Option<ExportJob>,
    export_dir: PathBuf,
}

impl BrowserSession {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Arc::new(DataClient::new(config)?);
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Arc<DataClient>, config: &ClientConfig) -> Self {
        let feed = Arc::new(RecordsFeed::new(client.clone()));
        let records = PaginationController::new(feed, config.default_page_size);
        Self {
            client,
            records,
            export: None,
            export_dir: config.export_dir.clone(),
        }
    }

    pub fn client(&self) -> &Arc<DataClient> {
        &self.client
    }

    pub fn records(&self) -> &PaginationController<RecordsFeed> {
        &self.records
    }

    pub async fn view(&self) -> PageView<Record> {
        self.records.snapshot().await
    }

    pub async fn vocabulary(&self) -> Result<FilterVocabulary> {
        self.client.fetch_filter_vocabulary().await
    }

    /// Push `filters` to the record view and, if open, the export dialog.
    pub async fn apply_filters(&mut self, filters: FilterSet) -> FilterUpdate {
        let records = &self.records;
        match self.export.as_mut() {
            Some(export) => {
                let (page, count) = tokio::join!(
                    records.set_filters(filters.clone()),
                    export.set_filters(filters)
                );
                FilterUpdate {
                    page,
                    export_count: Some(count),
                }
            }
            None => FilterUpdate {
                page: records.set_filters(filters).await,
                export_count: None,
            },
        }
    }

    /// Open the export dialog for the filters currently applied to the view.
    pub async fn open_export(&mut self, format: ExportFormat, file_name: &str) -> &mut ExportJob {
        let filters = self.records.snapshot().await.filters;
        let job = ExportJob::open(
            self.client.clone(),
            filters,
            format,
            file_name,
            self.export_dir.clone(),
        )
        .await;
        self.export.insert(job)
    }

    pub fn export(&mut self) -> Option<&mut ExportJob> {
        self.export.as_mut()
    }

    /// Dismiss the export dialog.
    pub fn close_export(&mut self) -> Option<ExportJob> {
        self.export.take()
    }
}

impl std::fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserSession")
            .field("export_open", &self.export.is_some())
            .field("export_dir", &self.export_dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::ScriptedTransport;
    use crate::export::ExportState;
    use crate::query::FilterField;
    use tempfile::tempdir;

    fn page_body(records: u64) -> String {
        serde_json::json!({
            "data": [],
            "total_pages": (records + 9) / 10,
            "total_records": records
        })
        .to_string()
    }

    fn session(transport: &Arc<ScriptedTransport>, dir: &std::path::Path) -> BrowserSession {
        let config = ClientConfig {
            export_dir: dir.to_path_buf(),
            ..ClientConfig::default()
        };
        let client = Arc::new(DataClient::with_transport(transport.clone()));
        BrowserSession::with_client(client, &config)
    }

    #[tokio::test]
    async fn test_filters_without_export_only_refresh_page() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("/data", 200, page_body(30));
        let dir = tempdir().unwrap();
        let mut session = session(&transport, dir.path());

        let update = session
            .apply_filters(FilterSet::new().toggle_value(FilterField::Gate, "north_in"))
            .await;

        assert_eq!(update.page.unwrap(), FetchOutcome::Applied);
        assert!(update.export_count.is_none());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_filters_reach_open_export() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("/data", 200, page_body(30));
        let dir = tempdir().unwrap();
        let mut session = session(&transport, dir.path());

        let job = session.open_export(ExportFormat::Csv, "gates").await;
        assert_eq!(job.record_count(), 30);

        transport.respond("/data", 200, page_body(12));
        let filters = FilterSet::new().with_search_term("MH12");
        let update = session.apply_filters(filters.clone()).await;

        assert_eq!(update.export_count.unwrap().unwrap(), 12);
        let job = session.export().unwrap();
        assert_eq!(job.filters(), &filters);
        assert_eq!(job.state(), ExportState::Idle);
        assert_eq!(session.view().await.result.total_records, 12);
    }

    #[tokio::test]
    async fn test_export_opens_with_view_filters() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("/data", 200, page_body(3));
        let dir = tempdir().unwrap();
        let mut session = session(&transport, dir.path());

        let filters = FilterSet::new().toggle_value(FilterField::Color, "Blue");
        session.apply_filters(filters.clone()).await.page.unwrap();
        let job = session.open_export(ExportFormat::Xlsx, "blue").await;

        assert_eq!(job.filters(), &filters);
        assert_eq!(job.target_path(), dir.path().join("blue.xlsx"));

        assert!(session.close_export().is_some());
        assert!(session.export().is_none());
    }
}
