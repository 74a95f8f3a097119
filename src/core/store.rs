//! Purpose: Own the authoritative client-side record collection and view state.
//! Exports: `RecordStore`, `Completion`, `Outcome`.
//! Role: Reducer applying finished remote operations and parameter changes.
//! Invariants: `all_items` holds at most one record per id.
//! Invariants: Only completed remote results change `all_items`; failures never do.
//! Invariants: The visible page is recomputed after every mutation or parameter change.
//! Invariants: The page-level load error is cleared only by a successful load.
//! Invariants: Records missing `createdAt` are stamped with the time they were received.
use crate::core::derive::{Page, derive_page};
use crate::core::error::{Error, ErrorKind};
use crate::core::filter::{FilterPatch, FilterState, Pagination, PaginationPatch};
use crate::core::record::{Record, now_timestamp};
use crate::notice::{Notice, Op};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// The finished result of one remote operation.
#[derive(Debug)]
pub enum Completion {
    Loaded(Result<Vec<Record>, Error>),
    Created(Result<Record, Error>),
    Updated(Result<Record, Error>),
    Deleted { id: u64, result: Result<(), Error> },
}

impl Completion {
    pub fn op(&self) -> Op {
        match self {
            Completion::Loaded(_) => Op::Load,
            Completion::Created(_) => Op::Create,
            Completion::Updated(_) => Op::Update,
            Completion::Deleted { .. } => Op::Delete,
        }
    }
}

/// An operation's result paired with the notice describing it.
#[derive(Debug)]
pub struct Outcome<T> {
    pub result: Result<T, Error>,
    pub notice: Notice,
}

#[derive(Debug)]
pub struct RecordStore {
    all_items: Vec<Record>,
    loading: bool,
    error: Option<String>,
    filters: FilterState,
    pagination: Pagination,
    page: Page,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(Pagination::default())
    }
}

impl RecordStore {
    pub fn new(pagination: Pagination) -> Self {
        Self {
            all_items: Vec::new(),
            loading: false,
            error: None,
            filters: FilterState::default(),
            pagination,
            page: Page::empty(pagination),
        }
    }

    pub fn all_items(&self) -> &[Record] {
        &self.all_items
    }

    pub fn get(&self, id: u64) -> Option<&Record> {
        self.all_items.iter().find(|record| record.id == id)
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Persistent page-level error left by the last failed load.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn begin_load(&mut self) {
        self.loading = true;
    }

    pub fn apply(&mut self, completion: Completion) -> Notice {
        match completion {
            Completion::Loaded(result) => self.apply_loaded(result).notice,
            Completion::Created(result) => self.apply_created(result).notice,
            Completion::Updated(result) => self.apply_updated(result).notice,
            Completion::Deleted { id, result } => self.apply_deleted(id, result).notice,
        }
    }

    pub fn apply_loaded(&mut self, result: Result<Vec<Record>, Error>) -> Outcome<usize> {
        self.loading = false;
        match result {
            Ok(records) => {
                let mut seen = HashSet::with_capacity(records.len());
                let received = now_timestamp().ok();
                self.all_items = records
                    .into_iter()
                    .filter(|record| seen.insert(record.id))
                    .map(|mut record| {
                        if record.created_at.is_none() {
                            record.created_at = received.clone();
                        }
                        record
                    })
                    .collect();
                self.error = None;
                self.recompute();
                let count = self.all_items.len();
                info!(count, "records loaded");
                Outcome {
                    result: Ok(count),
                    notice: Notice::success(Op::Load, "records loaded successfully")
                        .with_detail("count", count),
                }
            }
            Err(err) => {
                warn!(error = %err, "load failed");
                self.error = Some(err.to_string());
                let notice = failure_notice(Op::Load, "failed to load records", &err);
                Outcome {
                    result: Err(err),
                    notice,
                }
            }
        }
    }

    pub fn apply_created(&mut self, result: Result<Record, Error>) -> Outcome<Record> {
        match result {
            Ok(mut record) => {
                if record.created_at.is_none() {
                    record.created_at = now_timestamp().ok();
                }
                self.all_items.retain(|existing| existing.id != record.id);
                self.all_items.insert(0, record.clone());
                self.recompute();
                info!(id = record.id, "record created");
                let notice = Notice::success(Op::Create, "record created successfully")
                    .with_detail("id", record.id);
                Outcome {
                    result: Ok(record),
                    notice,
                }
            }
            Err(err) => {
                warn!(error = %err, "create failed");
                let notice = failure_notice(Op::Create, "failed to create record", &err);
                Outcome {
                    result: Err(err),
                    notice,
                }
            }
        }
    }

    pub fn apply_updated(&mut self, result: Result<Record, Error>) -> Outcome<Record> {
        match result {
            Ok(mut record) => {
                match self.all_items.iter_mut().find(|slot| slot.id == record.id) {
                    Some(slot) => {
                        if record.created_at.is_none() {
                            record.created_at = slot.created_at.clone();
                        }
                        *slot = record.clone();
                        info!(id = record.id, "record updated");
                    }
                    None => debug!(id = record.id, "updated record is not cached; ignoring"),
                }
                self.recompute();
                let notice = Notice::success(Op::Update, "record updated successfully")
                    .with_detail("id", record.id);
                Outcome {
                    result: Ok(record),
                    notice,
                }
            }
            Err(err) => {
                warn!(error = %err, "update failed");
                let notice = failure_notice(Op::Update, "failed to update record", &err);
                Outcome {
                    result: Err(err),
                    notice,
                }
            }
        }
    }

    pub fn apply_deleted(&mut self, id: u64, result: Result<(), Error>) -> Outcome<()> {
        let result = match result {
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(id, "remote reports record already absent");
                Ok(())
            }
            other => other,
        };
        match result {
            Ok(()) => {
                self.all_items.retain(|record| record.id != id);
                self.recompute();
                info!(id, "record deleted");
                Outcome {
                    result: Ok(()),
                    notice: Notice::success(Op::Delete, "record deleted successfully")
                        .with_detail("id", id),
                }
            }
            Err(err) => {
                warn!(id, error = %err, "delete failed");
                let notice = failure_notice(Op::Delete, "failed to delete record", &err)
                    .with_detail("id", id);
                Outcome {
                    result: Err(err),
                    notice,
                }
            }
        }
    }

    pub fn set_filters(&mut self, patch: FilterPatch) {
        debug!(?patch, "filters changed");
        self.filters.apply(patch);
        self.recompute();
    }

    /// Restores default filters and returns to the first page; the page size is kept.
    pub fn reset_filters(&mut self) {
        debug!("filters reset");
        self.filters = FilterState::default();
        self.pagination = self.pagination.first_page();
        self.recompute();
    }

    pub fn set_pagination(&mut self, patch: PaginationPatch) -> Result<(), Error> {
        self.pagination = self.pagination.patched(patch)?;
        debug!(
            page = self.pagination.page(),
            limit = self.pagination.limit(),
            "pagination changed"
        );
        self.recompute();
        Ok(())
    }

    fn recompute(&mut self) {
        self.page = derive_page(&self.all_items, &self.filters, self.pagination);
    }
}

fn failure_notice(op: Op, message: &str, err: &Error) -> Notice {
    Notice::error(op, message).with_detail("error", err.to_string())
}
