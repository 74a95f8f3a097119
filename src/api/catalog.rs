//! Purpose: Tie the remote contract to the record store as a single event reactor.
//! Exports: `Catalog`, `Applied`.
//! Role: Composition point used by the CLI; performs calls and applies completions.
//! Invariants: The catalog is the only writer of its `RecordStore`.
//! Invariants: Every operation returns its result together with the notice to forward.
//! Invariants: Background completions apply in completion order (last finish wins).
use super::client::{ApiResult, RecordApi};
use super::dispatch::{Dispatcher, Request, Ticket};
use crate::config::{CatalogConfig, DEFAULT_FETCH_LIMIT};
use crate::core::derive::Page;
use crate::core::error::Error;
use crate::core::filter::{FilterPatch, Pagination, PaginationPatch};
use crate::core::record::{Record, RecordDraft};
use crate::core::store::{Completion, Outcome, RecordStore};
use crate::notice::Notice;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// A background completion that has been applied to the store.
#[derive(Clone, Debug)]
pub struct Applied {
    pub ticket: Ticket,
    pub notice: Notice,
}

pub struct Catalog {
    api: Arc<dyn RecordApi>,
    store: RecordStore,
    fetch_limit: usize,
    dispatcher: Dispatcher,
}

impl Catalog {
    pub fn new(api: Arc<dyn RecordApi>) -> Self {
        Self::with_parts(api, RecordStore::default(), DEFAULT_FETCH_LIMIT)
    }

    pub fn from_config(api: Arc<dyn RecordApi>, config: &CatalogConfig) -> Result<Self, Error> {
        config.validate()?;
        let pagination = Pagination::new(1, config.page_limit)?;
        Ok(Self::with_parts(
            api,
            RecordStore::new(pagination),
            config.fetch_limit,
        ))
    }

    fn with_parts(api: Arc<dyn RecordApi>, store: RecordStore, fetch_limit: usize) -> Self {
        let dispatcher = Dispatcher::new(Arc::clone(&api), fetch_limit);
        Self {
            api,
            store,
            fetch_limit,
            dispatcher,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn page(&self) -> &Page {
        self.store.page()
    }

    pub fn fetch_limit(&self) -> usize {
        self.fetch_limit
    }

    pub fn load_all(&mut self) -> Outcome<usize> {
        self.store.begin_load();
        let result = self.api.list(0, self.fetch_limit);
        self.store.apply_loaded(result)
    }

    /// Reads one record straight from the remote; the store is not touched.
    pub fn fetch_one(&self, id: u64) -> ApiResult<Record> {
        self.api.get(id)
    }

    pub fn create(&mut self, draft: &RecordDraft) -> Outcome<Record> {
        let result = self.api.create(draft);
        self.store.apply_created(result)
    }

    pub fn update(&mut self, record: &Record) -> Outcome<Record> {
        let result = self.api.update(record);
        self.store.apply_updated(result)
    }

    pub fn delete(&mut self, id: u64) -> Outcome<()> {
        let result = self.api.delete(id);
        self.store.apply_deleted(id, result)
    }

    pub fn set_filters(&mut self, patch: FilterPatch) {
        self.store.set_filters(patch);
    }

    pub fn reset_filters(&mut self) {
        self.store.reset_filters();
    }

    pub fn set_pagination(&mut self, patch: PaginationPatch) -> Result<(), Error> {
        self.store.set_pagination(patch)
    }

    /// Starts a remote operation without waiting for it.
    pub fn submit(&mut self, request: Request) -> Ticket {
        if request == Request::Load {
            self.store.begin_load();
        }
        self.dispatcher.submit(request)
    }

    pub fn in_flight(&self) -> usize {
        self.dispatcher.in_flight()
    }

    /// Applies every completion that has already arrived.
    pub fn pump(&mut self) -> Vec<Applied> {
        let mut applied = Vec::new();
        while let Some((ticket, completion)) = self.dispatcher.try_next() {
            applied.push(self.apply(ticket, completion));
        }
        applied
    }

    /// Blocks up to `timeout` for one completion, then applies whatever else is ready.
    pub fn pump_wait(&mut self, timeout: Duration) -> Vec<Applied> {
        let mut applied = Vec::new();
        if let Some((ticket, completion)) = self.dispatcher.next_timeout(timeout) {
            applied.push(self.apply(ticket, completion));
        }
        applied.extend(self.pump());
        applied
    }

    /// Applies completions until nothing is in flight or `timeout` elapses.
    pub fn settle(&mut self, timeout: Duration) -> Vec<Applied> {
        let deadline = Instant::now() + timeout;
        let mut applied = Vec::new();
        while self.in_flight() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            applied.extend(self.pump_wait(remaining));
        }
        applied
    }

    fn apply(&mut self, ticket: Ticket, completion: Completion) -> Applied {
        let op = completion.op();
        let notice = self.store.apply(completion);
        info!(ticket, op = op.as_str(), kind = notice.kind.as_str(), "completion applied");
        Applied { ticket, notice }
    }
}
