//! Test doubles for the engine's seams.
//!
//! Available outside `cfg(test)` so integration tests and the examples can
//! use them.

mod memory_store;
mod mock_download_client;
mod mock_indexer_client;

pub use memory_store::MemoryStore;
pub use mock_download_client::{MockDownloadClient, RecordedSubmission};
pub use mock_indexer_client::{make_result, MockIndexerClient};
