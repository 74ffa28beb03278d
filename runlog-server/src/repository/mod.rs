//! Repository Module
//!
//! Data access layer for the server.
//! Everything the server persists lives in a blob store under `runs/`;
//! each repository owns the key layout and encoding for one kind of blob.
//!
//! Layout:
//! - `runs/index.json` - newest-first run index
//! - `runs/<run_id>/logs.jsonl` - durable run log
//! - `runs/<run_id>/run.json` - run record
//! - `runs/<run_id>/cancel.json` - cancellation flag

pub mod blob;
pub mod cancel;
pub mod fs_blob;
pub mod log;
pub mod pg_blob;
pub mod run;

// Re-export for convenience
pub use blob::{BlobMeta, BlobStore, MemoryBlobStore, StoreError};
pub use cancel as cancel_repository;
pub use fs_blob::FsBlobStore;
pub use log as log_repository;
pub use pg_blob::PgBlobStore;
pub use run as run_repository;

pub const RUNS_PREFIX: &str = "runs/";

pub fn run_prefix(run_id: &str) -> String {
    format!("{}{}/", RUNS_PREFIX, run_id)
}

pub fn log_key(run_id: &str) -> String {
    format!("{}logs.jsonl", run_prefix(run_id))
}

pub fn run_key(run_id: &str) -> String {
    format!("{}run.json", run_prefix(run_id))
}

pub fn cancel_key(run_id: &str) -> String {
    format!("{}cancel.json", run_prefix(run_id))
}

pub fn index_key() -> String {
    format!("{}index.json", RUNS_PREFIX)
}
