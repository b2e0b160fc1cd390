//! Outbound adapters implementing domain ports.
//!
//! - **memory**: in-memory record store built from a site snapshot
//! - **snapshot**: JSON snapshot files read and written through `cap-std`
//! - **progress**: progress reporting through `tracing`
//!
//! Adapters translate between domain types and their storage form. They
//! contain no sanitization rules.

mod atomic_io;
mod memory;
mod progress;
mod snapshot;

pub use memory::{
    InMemoryRecordStore, MAIN_SITE, SiteSnapshot, SnapshotError, StoreSnapshot, hash_password,
};
pub use progress::TracingProgress;
pub use snapshot::{SnapshotFileError, load_snapshot, save_snapshot};
