//! Purpose: Library crate behind the `catalog` CLI.
//! Exports: `api` (public surface), `core` (store, derivation, errors), `notice`, `config`.
//! Role: Client-side record catalog: load, filter, sort, paginate, and mutate remote records.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
//! Invariants: The derivation engine is pure; only the store mutates the collection.
pub mod api;
pub mod config;
pub mod core;
pub mod notice;
