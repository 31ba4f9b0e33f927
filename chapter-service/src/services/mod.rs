pub mod chapters;
pub mod firestore;
pub mod memory;
pub mod metrics;
pub mod store;

pub use chapters::ChapterService;
pub use firestore::FirestoreStore;
pub use memory::InMemoryStore;
pub use metrics::{get_metrics, init_metrics, record_lookup};
pub use store::{DocumentStore, Record, RecordError, StoreError};
