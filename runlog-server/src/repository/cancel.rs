//! Cancel Flag Repository
//!
//! Durable cancellation flags, readable by every server instance.

use runlog_core::domain::cancel::CancelFlag;

use super::blob::{BlobStore, StoreError, get_json, put_json};
use super::cancel_key;

/// Find the cancellation flag of a run; `None` means no cancel was requested
pub async fn find_by_run(store: &dyn BlobStore, run_id: &str) -> Result<Option<CancelFlag>, StoreError> {
    get_json(store, &cancel_key(run_id)).await
}

/// Create or replace a run's cancellation flag
pub async fn save(store: &dyn BlobStore, flag: &CancelFlag) -> Result<(), StoreError> {
    put_json(store, &cancel_key(&flag.run_id), flag).await
}
