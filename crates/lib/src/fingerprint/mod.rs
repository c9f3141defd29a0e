//! Persistent fingerprint store.
//!
//! # Storage Layout
//!
//! ```text
//! <project>/
//! ├── .isengard.db        # {"version": 1, "fingerprints": {<target>: <fingerprint>}}
//! └── .isengard.db.lock   # holder metadata, flock'ed while connected
//! ```

mod db;
mod lock;

pub use db::{FingerprintDb, FingerprintDbError};
pub use lock::{DbLock, LockError, LockMetadata};
