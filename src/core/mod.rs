// Core modules: records, view parameters, derivation, store, and notice board.
pub mod board;
pub mod derive;
pub mod error;
pub mod filter;
pub mod record;
pub mod store;
