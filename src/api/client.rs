//! Purpose: Define the remote CRUD contract and an in-memory implementation of it.
//! Exports: `RecordApi`, `MemoryClient`, `ApiResult`.
//! Role: Seam between the catalog and whatever serves records (HTTP, memory, fakes).
//! Invariants: Implementations are `Send + Sync` so completions can run off-thread.
//! Invariants: `get`/`update`/`delete` of an unknown id fail with `NotFound`.
#![allow(clippy::result_large_err)]

use crate::core::error::{Error, ErrorKind};
use crate::core::record::{Record, RecordDraft, now_timestamp};
use std::sync::{Arc, Mutex, MutexGuard};

pub type ApiResult<T> = Result<T, Error>;

/// CRUD over the single "record" resource. No ordering is promised by `list`.
pub trait RecordApi: Send + Sync {
    fn list(&self, offset: usize, limit: usize) -> ApiResult<Vec<Record>>;

    fn get(&self, id: u64) -> ApiResult<Record>;

    /// The server assigns the id.
    fn create(&self, draft: &RecordDraft) -> ApiResult<Record>;

    fn update(&self, record: &Record) -> ApiResult<Record>;

    fn delete(&self, id: u64) -> ApiResult<()>;
}

impl<T: RecordApi + ?Sized> RecordApi for Arc<T> {
    fn list(&self, offset: usize, limit: usize) -> ApiResult<Vec<Record>> {
        (**self).list(offset, limit)
    }

    fn get(&self, id: u64) -> ApiResult<Record> {
        (**self).get(id)
    }

    fn create(&self, draft: &RecordDraft) -> ApiResult<Record> {
        (**self).create(draft)
    }

    fn update(&self, record: &Record) -> ApiResult<Record> {
        (**self).update(record)
    }

    fn delete(&self, id: u64) -> ApiResult<()> {
        (**self).delete(id)
    }
}

/// Records held in process memory; backs `catalog serve` and tests.
#[derive(Debug, Default)]
pub struct MemoryClient {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    records: Vec<Record>,
    next_id: u64,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        let next_id = records.iter().map(|record| record.id).max().unwrap_or(0).saturating_add(1);
        Self {
            state: Mutex::new(MemoryState { records, next_id }),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl RecordApi for MemoryClient {
    fn list(&self, offset: usize, limit: usize) -> ApiResult<Vec<Record>> {
        let state = self.lock();
        Ok(state
            .records
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn get(&self, id: u64) -> ApiResult<Record> {
        let state = self.lock();
        state
            .records
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    fn create(&self, draft: &RecordDraft) -> ApiResult<Record> {
        let mut state = self.lock();
        let id = state.next_id.max(1);
        if state.records.iter().any(|record| record.id == id) {
            return Err(Error::new(ErrorKind::Internal)
                .with_message("record ids exhausted")
                .with_id(id));
        }
        state.next_id = id.saturating_add(1);
        let mut record = Record::from_draft(id, draft.clone());
        if record.created_at.is_none() {
            record.created_at = Some(now_timestamp()?);
        }
        state.records.push(record.clone());
        Ok(record)
    }

    fn update(&self, record: &Record) -> ApiResult<Record> {
        let mut state = self.lock();
        let slot = state
            .records
            .iter_mut()
            .find(|slot| slot.id == record.id)
            .ok_or_else(|| not_found(record.id))?;
        let mut updated = record.clone();
        if updated.created_at.is_none() {
            updated.created_at = slot.created_at.clone();
        }
        *slot = updated.clone();
        Ok(updated)
    }

    fn delete(&self, id: u64) -> ApiResult<()> {
        let mut state = self.lock();
        let before = state.records.len();
        state.records.retain(|record| record.id != id);
        if state.records.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }
}

fn not_found(id: u64) -> Error {
    Error::new(ErrorKind::NotFound)
        .with_message("record not found")
        .with_id(id)
}
