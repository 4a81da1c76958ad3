//! Pagination state machine
//!
//! Transitions take `&self` and may overlap. Each fetch is issued under a
//! new generation number together with the descriptor that produced it;
//! when it completes, its outcome is applied only if no later fetch has been
//! issued in the meantime. The state lock is never held across the network
//! call.

use std::sync::Arc;
use tokio::sync::Mutex;

use super::source::PageSource;
use crate::error::{ErrorKind, Result};
use crate::models::ResultPage;
use crate::query::{build, FilterSet, PageSize, RequestDescriptor};

/// What a transition did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A fetch ran and its page is now visible
    Applied,
    /// A fetch ran but a newer one superseded it; its outcome was dropped
    Stale,
    /// The transition was a no-op and nothing was fetched
    Skipped,
}

/// Read-only copy of the controller state for display
#[derive(Debug, Clone)]
pub struct PageView<T> {
    /// Requested cursor; runs ahead of `shown` only while a fetch is in flight
    pub page: u32,
    pub page_size: PageSize,
    pub filters: FilterSet,
    pub result: ResultPage<T>,
    /// Descriptor that produced `result`
    pub shown: Option<RequestDescriptor>,
    pub last_error: Option<ErrorKind>,
    pub loading: bool,
}

/// A fetch that has been issued and not yet resolved
struct Ticket {
    generation: u64,
    descriptor: RequestDescriptor,
}

struct State<T> {
    page: u32,
    page_size: PageSize,
    filters: FilterSet,
    result: ResultPage<T>,
    shown: Option<RequestDescriptor>,
    last_error: Option<ErrorKind>,
    latest_generation: u64,
    in_flight: Option<RequestDescriptor>,
}

impl<T> State<T> {
    fn issue(&mut self) -> Ticket {
        self.latest_generation += 1;
        let descriptor = build(&self.filters, self.page, self.page_size);
        self.in_flight = Some(descriptor.clone());
        Ticket {
            generation: self.latest_generation,
            descriptor,
        }
    }

    /// Move to `target` if it is a real page other than the current one.
    fn move_to(&mut self, target: u32) -> Option<Ticket> {
        let total = self.result.total_pages;
        if total == 0 || target == self.page || target < 1 || u64::from(target) > total {
            return None;
        }
        self.page = target;
        Some(self.issue())
    }

    /// Point the cursor back at what is on screen after a failed fetch, so
    /// that repeating the failed action issues it again.
    fn roll_back(&mut self) {
        match &self.shown {
            Some(shown) => {
                self.page = shown.page();
                self.page_size = shown.page_size();
                self.filters = shown.filters().clone();
            }
            None => {
                self.page = 1;
                self.filters = FilterSet::default();
            }
        }
    }

    fn last_page(&self) -> u32 {
        u32::try_from(self.result.total_pages).unwrap_or(u32::MAX)
    }
}

pub struct PaginationController<S: PageSource> {
    source: Arc<S>,
    state: Mutex<State<S::Row>>,
}

impl<S: PageSource> PaginationController<S> {
    pub fn new(source: Arc<S>, page_size: PageSize) -> Self {
        Self {
            source,
            state: Mutex::new(State {
                page: 1,
                page_size,
                filters: FilterSet::default(),
                result: ResultPage::empty(),
                shown: None,
                last_error: None,
                latest_generation: 0,
                in_flight: None,
            }),
        }
    }

    pub async fn snapshot(&self) -> PageView<S::Row> {
        let state = self.state.lock().await;
        PageView {
            page: state.page,
            page_size: state.page_size,
            filters: state.filters.clone(),
            result: state.result.clone(),
            shown: state.shown.clone(),
            last_error: state.last_error,
            loading: state.in_flight.is_some(),
        }
    }

    /// Replace the filters; any real change restarts from page 1.
    pub async fn set_filters(&self, filters: FilterSet) -> Result<FetchOutcome> {
        let ticket = {
            let mut state = self.state.lock().await;
            if state.filters == filters {
                return Ok(FetchOutcome::Skipped);
            }
            state.filters = filters;
            state.page = 1;
            state.issue()
        };
        self.run(ticket).await
    }

    pub async fn set_page_size(&self, page_size: PageSize) -> Result<FetchOutcome> {
        let ticket = {
            let mut state = self.state.lock().await;
            state.page_size = page_size;
            state.page = 1;
            state.issue()
        };
        self.run(ticket).await
    }

    /// Jump to `page`; out-of-range targets are ignored.
    pub async fn go_to_page(&self, page: u32) -> Result<FetchOutcome> {
        let ticket = self.state.lock().await.move_to(page);
        self.run_if(ticket).await
    }

    pub async fn next_page(&self) -> Result<FetchOutcome> {
        let ticket = {
            let mut state = self.state.lock().await;
            let target = state.page.saturating_add(1).min(state.last_page()).max(1);
            state.move_to(target)
        };
        self.run_if(ticket).await
    }

    pub async fn previous_page(&self) -> Result<FetchOutcome> {
        let ticket = {
            let mut state = self.state.lock().await;
            let target = state.page.saturating_sub(1).max(1);
            state.move_to(target)
        };
        self.run_if(ticket).await
    }

    /// Re-issue the request for the current cursor.
    pub async fn refresh(&self) -> Result<FetchOutcome> {
        let ticket = self.state.lock().await.issue();
        self.run(ticket).await
    }

    async fn run_if(&self, ticket: Option<Ticket>) -> Result<FetchOutcome> {
        match ticket {
            Some(ticket) => self.run(ticket).await,
            None => Ok(FetchOutcome::Skipped),
        }
    }

    async fn run(&self, ticket: Ticket) -> Result<FetchOutcome> {
        let fetched = self.source.fetch(&ticket.descriptor).await;

        let mut state = self.state.lock().await;
        if ticket.generation != state.latest_generation {
            log::debug!(
                "Discarding stale page {} (generation {}, latest {})",
                ticket.descriptor.page(),
                ticket.generation,
                state.latest_generation
            );
            return Ok(FetchOutcome::Stale);
        }
        state.in_flight = None;

        match fetched {
            Ok(page) => {
                log::debug!(
                    "Showing page {}/{} ({} records)",
                    ticket.descriptor.page(),
                    page.total_pages,
                    page.total_records
                );
                state.result = page;
                state.shown = Some(ticket.descriptor);
                state.last_error = None;
                Ok(FetchOutcome::Applied)
            }
            Err(e) => {
                log::warn!("Page fetch failed, keeping previous results: {}", e);
                state.roll_back();
                state.last_error = Some(e.kind());
                Err(e)
            }
        }
    }
}
