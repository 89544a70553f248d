// =============================================================================
// Snapshot Module — the served document, its status block and persistence
// =============================================================================

pub mod model;
pub mod status;
pub mod store;

pub use model::{HistoryEntry, Snapshot};
pub use status::DataStatusTracker;
pub use store::{JsonFileStore, SnapshotSink};
