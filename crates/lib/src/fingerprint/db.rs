use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::lock::{DbLock, LockError};
use crate::consts::FINGERPRINT_DB_VERSION;
use crate::target::{Fingerprint, TargetId};

#[derive(Debug, Error)]
pub enum FingerprintDbError {
  #[error(transparent)]
  Lock(#[from] LockError),

  #[error("failed to read fingerprint database {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse fingerprint database {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("unsupported fingerprint database version {version} in {path}")]
  UnsupportedVersion { path: PathBuf, version: u32 },

  #[error("failed to serialize fingerprint database: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("failed to write fingerprint database {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DbFile {
  version: u32,
  fingerprints: BTreeMap<TargetId, Fingerprint>,
}

/// An open connection to the fingerprint database.
///
/// Connecting takes the database lock and loads every record; dropping the
/// connection releases the lock. Reads always see the state as loaded.
/// Writes are staged and only reach the disk through [`FingerprintDb::commit`],
/// so a connection dropped on an error path leaves the database untouched.
#[derive(Debug)]
pub struct FingerprintDb {
  path: PathBuf,
  records: BTreeMap<TargetId, Fingerprint>,
  staged: BTreeMap<TargetId, Option<Fingerprint>>,
  _lock: DbLock,
}

impl FingerprintDb {
  /// Open the database at `path`, creating an empty one if it does not exist.
  pub fn connect(path: impl AsRef<Path>) -> Result<Self, FingerprintDbError> {
    let path = path.as_ref().to_path_buf();
    let lock = DbLock::acquire(&path)?;

    let records = match fs::read_to_string(&path) {
      Ok(content) => {
        let file: DbFile = serde_json::from_str(&content).map_err(|source| FingerprintDbError::Parse {
          path: path.clone(),
          source,
        })?;
        if file.version != FINGERPRINT_DB_VERSION {
          return Err(FingerprintDbError::UnsupportedVersion {
            path,
            version: file.version,
          });
        }
        file.fingerprints
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
      Err(source) => return Err(FingerprintDbError::Read { path, source }),
    };

    debug!(path = ?path, records = records.len(), "connected to fingerprint database");

    Ok(Self {
      path,
      records,
      staged: BTreeMap::new(),
      _lock: lock,
    })
  }

  /// Fingerprint recorded for `id` before this connection staged anything.
  pub fn fetch_previous_fingerprint(&self, id: &TargetId) -> Option<Fingerprint> {
    self.records.get(id).cloned()
  }

  /// Stage a new fingerprint for `id`; `None` removes the record.
  pub fn stage(&mut self, id: TargetId, fingerprint: Option<Fingerprint>) {
    self.staged.insert(id, fingerprint);
  }

  /// Stage removal of the record for `id`.
  pub fn forget(&mut self, id: TargetId) {
    self.stage(id, None);
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  /// Apply staged changes and write the database atomically.
  ///
  /// Returns how many records changed. Nothing is written when no record
  /// changed.
  pub fn commit(mut self) -> Result<usize, FingerprintDbError> {
    let mut changed = 0;
    for (id, fingerprint) in std::mem::take(&mut self.staged) {
      let previous = match fingerprint {
        Some(fp) => self.records.insert(id, fp.clone()).filter(|old| *old == fp),
        None => match self.records.remove(&id) {
          Some(_) => None,
          None => continue,
        },
      };
      if previous.is_none() {
        changed += 1;
      }
    }

    if changed == 0 {
      return Ok(0);
    }

    let file = DbFile {
      version: FINGERPRINT_DB_VERSION,
      fingerprints: std::mem::take(&mut self.records),
    };
    let content = serde_json::to_string_pretty(&file).map_err(FingerprintDbError::Serialize)?;

    let mut temp_name = self.path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let write_err = |source| FingerprintDbError::Write {
      path: self.path.clone(),
      source,
    };
    fs::write(&temp_path, content).map_err(write_err)?;
    fs::rename(&temp_path, &self.path).map_err(write_err)?;

    debug!(path = ?self.path, changed, "committed fingerprints");
    Ok(changed)
  }
}
