use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{CookedTarget, CookedValue, Fingerprint, TargetError, TargetHandler, TargetId};
use crate::consts::{FOLDER_TARGET_SUFFIX, VIRTUAL_TARGET_PREFIX};
use crate::util::hash::hash_file;

/// Regular files, fingerprinted by content.
#[derive(Debug, Clone)]
pub struct FileHandler {
  root: PathBuf,
}

impl FileHandler {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  fn path_of<'a>(&self, target: &'a CookedTarget) -> Result<&'a Path, TargetError> {
    match &target.value {
      CookedValue::File(path) => Ok(path),
      other => Err(TargetError::KindMismatch {
        handler: self.kind(),
        target: target.id.clone(),
        value: other.clone(),
      }),
    }
  }
}

impl TargetHandler for FileHandler {
  fn kind(&self) -> &'static str {
    "file"
  }

  fn claims(&self, id: &TargetId) -> bool {
    let id = id.as_str();
    !id.is_empty() && !id.starts_with(VIRTUAL_TARGET_PREFIX) && !id.ends_with(FOLDER_TARGET_SUFFIX)
  }

  fn cook(&self, id: &TargetId, _previous: Option<&Fingerprint>) -> Result<CookedValue, TargetError> {
    Ok(CookedValue::File(self.root.join(id.as_str())))
  }

  fn fingerprint(&self, target: &CookedTarget) -> Result<Option<Fingerprint>, TargetError> {
    let path = self.path_of(target)?;

    match fs::metadata(path) {
      Ok(_) => {}
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
      Err(source) => {
        return Err(TargetError::Stat {
          path: path.to_path_buf(),
          source,
        });
      }
    }

    let hash = hash_file(path).map_err(|source| TargetError::Fingerprint {
      target: target.id.clone(),
      source,
    })?;
    Ok(Some(Fingerprint(hash)))
  }

  fn clean(&self, target: &CookedTarget) -> Result<(), TargetError> {
    let path = self.path_of(target)?;

    match fs::remove_file(path) {
      Ok(()) => {
        debug!(path = ?path, "removed file");
        Ok(())
      }
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(source) => Err(TargetError::Clean {
        path: path.to_path_buf(),
        source,
      }),
    }
  }

  fn allows_non_rule_generated_target(&self) -> bool {
    true
  }
}
