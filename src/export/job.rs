//! Export flow
//!
//! An [`ExportJob`] lives while the operator has the export dialog open. It
//! keeps the number of matching records current for its filters and, once
//! confirmed, writes the full filtered set to `{dir}/{file_name}{ext}`.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use super::writer::{sanitize_file_name, write_export, ExportProgress};
use crate::client::DataClient;
use crate::error::{ClientError, ErrorKind};
use crate::models::ExportFormat;
use crate::query::{build, ExportQuery, FilterSet, PageSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExportState {
    Idle,
    CountingRecords,
    Exporting,
    Succeeded,
    Failed,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExportError {
    #[error("Nothing to export: no records match the current filters")]
    NoRecords,

    #[error("Export cannot start while {0:?}")]
    NotReady(ExportState),

    #[error(transparent)]
    Failed(#[from] ClientError),
}

pub struct ExportJob {
    client: Arc<DataClient>,
    filters: FilterSet,
    format: ExportFormat,
    file_name: String,
    dir: PathBuf,
    state: ExportState,
    record_count: u64,
    error: Option<ErrorKind>,
    saved_to: Option<PathBuf>,
}

impl ExportJob {
    /// Open the flow and count what the filters currently match.
    pub async fn open(
        client: Arc<DataClient>,
        filters: FilterSet,
        format: ExportFormat,
        file_name: &str,
        dir: impl Into<PathBuf>,
    ) -> Self {
        let mut job = Self {
            client,
            filters,
            format,
            file_name: sanitize_file_name(file_name),
            dir: dir.into(),
            state: ExportState::Idle,
            record_count: 0,
            error: None,
            saved_to: None,
        };
        // a failed count is visible through `error()`; the dialog stays usable
        let _ = job.refresh_count().await;
        job
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn error(&self) -> Option<ErrorKind> {
        self.error
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Path written on success
    pub fn saved_to(&self) -> Option<&Path> {
        self.saved_to.as_deref()
    }

    /// Where a confirmed export would land
    pub fn target_path(&self) -> PathBuf {
        self.dir
            .join(format!("{}{}", self.file_name, self.format.extension()))
    }

    pub fn set_format(&mut self, format: ExportFormat) {
        self.format = format;
    }

    pub fn set_file_name(&mut self, name: &str) {
        self.file_name = sanitize_file_name(name);
    }

    pub fn can_confirm(&self) -> bool {
        matches!(self.state, ExportState::Idle | ExportState::Failed) && self.record_count > 0
    }

    /// Adopt new filters and recount.
    pub async fn set_filters(&mut self, filters: FilterSet) -> Result<u64, ClientError> {
        self.filters = filters;
        self.refresh_count().await
    }

    /// Re-fetch the number of records the current filters match. On failure
    /// the count drops to 0, which keeps confirmation disabled until a recount
    /// succeeds.
    pub async fn refresh_count(&mut self) -> Result<u64, ClientError> {
        self.state = ExportState::CountingRecords;
        let probe = build(&self.filters, 1, PageSize::default());
        let counted = self.client.fetch_count(&probe).await;
        self.state = ExportState::Idle;

        match counted {
            Ok(count) => {
                log::debug!("Export would contain {} records", count);
                self.record_count = count;
                self.error = None;
                Ok(count)
            }
            Err(e) => {
                log::warn!("Failed to count export records: {}", e);
                self.record_count = 0;
                self.error = Some(e.kind());
                Err(e)
            }
        }
    }

    /// Run the export. Rejected without side effects unless the job is
    /// idle (or failed) and at least one record matches.
    pub async fn confirm<F>(&mut self, mut on_progress: F) -> Result<PathBuf, ExportError>
    where
        F: FnMut(ExportProgress) + Send,
    {
        if !matches!(self.state, ExportState::Idle | ExportState::Failed) {
            return Err(ExportError::NotReady(self.state));
        }
        if self.record_count == 0 {
            return Err(ExportError::NoRecords);
        }

        self.state = ExportState::Exporting;
        self.error = None;
        let target = self.target_path();
        log::info!(
            "Exporting {} records as {} to {}",
            self.record_count,
            self.format.as_param(),
            target.display()
        );

        match self.transfer(&target, &mut on_progress).await {
            Ok(_) => {
                self.state = ExportState::Succeeded;
                self.saved_to = Some(target.clone());
                Ok(target)
            }
            Err(e) => {
                self.state = ExportState::Failed;
                self.error = Some(e.kind());
                Err(ExportError::Failed(e))
            }
        }
    }

    async fn transfer(
        &self,
        target: &Path,
        on_progress: &mut (dyn FnMut(ExportProgress) + Send),
    ) -> Result<u64, ClientError> {
        let query = ExportQuery::new(&self.filters, self.format);
        let response = self.client.open_export(&query).await?;
        write_export(response, target, on_progress).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::ScriptedTransport;
    use crate::query::FilterField;
    use tempfile::tempdir;

    fn totals(records: u64) -> String {
        serde_json::json!({
            "data": [],
            "total_pages": records,
            "total_records": records
        })
        .to_string()
    }

    fn client_with(transport: &Arc<ScriptedTransport>) -> Arc<DataClient> {
        Arc::new(DataClient::with_transport(transport.clone()))
    }

    #[tokio::test]
    async fn test_zero_records_cannot_confirm() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("/data", 200, totals(0));
        let dir = tempdir().unwrap();

        let mut job = ExportJob::open(
            client_with(&transport),
            FilterSet::new(),
            ExportFormat::Csv,
            "empty",
            dir.path(),
        )
        .await;

        assert_eq!(job.record_count(), 0);
        assert!(!job.can_confirm());
        assert_eq!(job.confirm(|_| {}).await.unwrap_err(), ExportError::NoRecords);
        assert_eq!(job.state(), ExportState::Idle);
        assert!(transport.requests().iter().all(|(path, _)| path != "/export"));
    }

    #[tokio::test]
    async fn test_count_probe_asks_for_one_row() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("/data", 200, totals(42));
        let dir = tempdir().unwrap();

        let filters = FilterSet::new().toggle_value(FilterField::Category, "Sedan");
        let job = ExportJob::open(
            client_with(&transport),
            filters,
            ExportFormat::Csv,
            "x",
            dir.path(),
        )
        .await;

        assert_eq!(job.record_count(), 42);
        let (path, query) = transport.requests().pop().unwrap();
        assert_eq!(path, "/data");
        assert!(query.contains(&("page_size", "1".to_string())));
        assert!(query.contains(&("category", "Sedan".to_string())));
    }

    #[tokio::test]
    async fn test_confirm_writes_named_file() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("/data", 200, totals(2));
        transport.respond_chunks(
            "/export",
            200,
            Some(21),
            vec![Ok(b"plate,gate\n".to_vec()), Ok(b"MH12,n_in\n".to_vec())],
        );
        let dir = tempdir().unwrap();

        let mut job = ExportJob::open(
            client_with(&transport),
            FilterSet::new(),
            ExportFormat::Csv,
            "march",
            dir.path(),
        )
        .await;
        let mut last = None;
        let path = job.confirm(|p| last = Some(p)).await.unwrap();

        assert_eq!(path, dir.path().join("march.csv"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "plate,gate\nMH12,n_in\n");
        assert_eq!(job.state(), ExportState::Succeeded);
        assert_eq!(job.saved_to(), Some(path.as_path()));
        assert_eq!(
            last,
            Some(ExportProgress {
                bytes_written: 21,
                total_bytes: Some(21)
            })
        );

        let (_, query) = transport.requests().pop().unwrap();
        assert!(query.contains(&("file_format", "csv".to_string())));
    }

    #[tokio::test]
    async fn test_dropped_connection_leaves_no_file() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("/data", 200, totals(5));
        transport.respond_chunks(
            "/export",
            200,
            None,
            vec![Ok(b"partial".to_vec()), Err("connection reset".to_string())],
        );
        let dir = tempdir().unwrap();

        let mut job = ExportJob::open(
            client_with(&transport),
            FilterSet::new(),
            ExportFormat::Xlsx,
            "broken",
            dir.path(),
        )
        .await;
        let err = job.confirm(|_| {}).await.unwrap_err();

        assert!(matches!(err, ExportError::Failed(ClientError::ExportAborted(_))));
        assert_eq!(job.state(), ExportState::Failed);
        assert_eq!(job.error(), Some(ErrorKind::ExportAborted));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        // failed jobs may be retried
        assert!(job.can_confirm());
    }

    #[tokio::test]
    async fn test_rejected_export_request() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("/data", 200, totals(5));
        transport.respond("/export", 500, "boom");
        let dir = tempdir().unwrap();

        let mut job = ExportJob::open(
            client_with(&transport),
            FilterSet::new(),
            ExportFormat::Csv,
            "x",
            dir.path(),
        )
        .await;
        job.confirm(|_| {}).await.unwrap_err();

        assert_eq!(job.error(), Some(ErrorKind::ServerRejected { status: 500 }));
        assert_eq!(job.state(), ExportState::Failed);
    }

    #[tokio::test]
    async fn test_count_failure_disables_confirm() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("/data", 200, totals(7));
        transport.respond("/export", 200, "plate\n");
        let dir = tempdir().unwrap();
        let mut job = ExportJob::open(
            client_with(&transport),
            FilterSet::new(),
            ExportFormat::Csv,
            "x",
            dir.path(),
        )
        .await;
        assert!(job.can_confirm());

        transport.forget("/data");
        let filters = FilterSet::new().with_search_term("NOMATCH");
        let err = job.set_filters(filters.clone()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unreachable);
        assert_eq!(job.record_count(), 0);
        assert_eq!(job.state(), ExportState::Idle);
        assert_eq!(job.error(), Some(ErrorKind::Unreachable));
        assert_eq!(job.filters(), &filters);
        assert!(!job.can_confirm());
        assert_eq!(job.confirm(|_| {}).await.unwrap_err(), ExportError::NoRecords);
        assert!(!job.target_path().exists());

        // a successful recount re-enables confirmation
        transport.respond("/data", 200, totals(3));
        assert_eq!(job.refresh_count().await.unwrap(), 3);
        assert!(job.can_confirm());
    }

    #[tokio::test]
    async fn test_blank_name_falls_back() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond("/data", 200, totals(1));
        let dir = tempdir().unwrap();
        let job = ExportJob::open(
            client_with(&transport),
            FilterSet::new(),
            ExportFormat::Xlsx,
            "  ",
            dir.path(),
        )
        .await;

        assert_eq!(job.target_path(), dir.path().join("export.xlsx"));
    }
}
