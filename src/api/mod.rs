//! Purpose: Define the public Rust API boundary for the catalog.
//! Exports: Core types plus the remote contract, its clients, and the catalog reactor.
//! Role: Public, additive-only surface used by the CLI and embedders.
//! Invariants: Callers reach store and derivation types only through these re-exports.
//! Invariants: Transport details (HTTP, threads) stay behind `RecordApi` and `Catalog`.

mod catalog;
mod client;
mod dispatch;
mod remote;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::board::{DEFAULT_NOTICE_TTL, NoticeBoard, NoticeId, Posted};
pub use crate::core::derive::{Page, derive_page};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::filter::{
    DateRange, FilterPatch, FilterState, Pagination, PaginationPatch, SortBy, SortOrder,
};
pub use crate::core::record::{Record, RecordDraft, parse_timestamp};
pub use crate::core::store::{Completion, Outcome, RecordStore};
pub use catalog::{Applied, Catalog};
pub use client::{ApiResult, MemoryClient, RecordApi};
pub use dispatch::{Request, Ticket};
pub use remote::RemoteClient;
