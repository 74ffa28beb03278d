//! Run Repository
//!
//! Run records and the newest-first run index.

use runlog_core::domain::run::{RunIndex, RunRecord};

use super::blob::{BlobStore, StoreError, get_json, put_json};
use super::{index_key, run_key};

/// Find a run record by ID
pub async fn find_by_id(store: &dyn BlobStore, run_id: &str) -> Result<Option<RunRecord>, StoreError> {
    get_json(store, &run_key(run_id)).await
}

/// Create or replace a run record
pub async fn save(store: &dyn BlobStore, record: &RunRecord) -> Result<(), StoreError> {
    put_json(store, &run_key(&record.run_id), record).await
}

/// Read the run index; `None` if it was never written
pub async fn read_index(store: &dyn BlobStore) -> Result<Option<RunIndex>, StoreError> {
    get_json(store, &index_key()).await
}

/// Replace the run index
pub async fn write_index(store: &dyn BlobStore, index: &RunIndex) -> Result<(), StoreError> {
    put_json(store, &index_key(), index).await
}

/// Put a run at the head of the index, creating the index if absent
pub async fn prepend_to_index(store: &dyn BlobStore, record: &RunRecord) -> Result<(), StoreError> {
    let mut index = read_index(store).await?.unwrap_or_default();
    index.prepend(record.summary());
    write_index(store, &index).await
}
