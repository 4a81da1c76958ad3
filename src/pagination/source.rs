//! Page sources
//!
//! The controller only needs "descriptor in, page out"; these adapters bind it
//! to the two paged feeds of the service.

use async_trait::async_trait;
use std::sync::Arc;

use crate::client::DataClient;
use crate::error::Result;
use crate::models::{CrossingEvent, Record, ResultPage};
use crate::query::RequestDescriptor;

#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    type Row: Clone + Send + Sync + 'static;

    async fn fetch(&self, descriptor: &RequestDescriptor) -> Result<ResultPage<Self::Row>>;
}

/// Paired entry/exit records from `/data`
pub struct RecordsFeed {
    client: Arc<DataClient>,
}

impl RecordsFeed {
    pub fn new(client: Arc<DataClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for RecordsFeed {
    type Row = Record;

    async fn fetch(&self, descriptor: &RequestDescriptor) -> Result<ResultPage<Record>> {
        self.client.fetch_page(descriptor).await
    }
}

/// Raw events from `/dashboard/data`; only the search term is honoured
pub struct DashboardFeed {
    client: Arc<DataClient>,
}

impl DashboardFeed {
    pub fn new(client: Arc<DataClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for DashboardFeed {
    type Row = CrossingEvent;

    async fn fetch(&self, descriptor: &RequestDescriptor) -> Result<ResultPage<CrossingEvent>> {
        self.client.fetch_dashboard_page(descriptor).await
    }
}
