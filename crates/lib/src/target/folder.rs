use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{CookedTarget, CookedValue, Fingerprint, TargetError, TargetHandler, TargetId};
use crate::consts::FOLDER_TARGET_SUFFIX;
use crate::util::hash::hash_tree;

/// Directories, spelled with a trailing `/` and fingerprinted by tree hash.
#[derive(Debug, Clone)]
pub struct FolderHandler {
  root: PathBuf,
}

impl FolderHandler {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  fn path_of<'a>(&self, target: &'a CookedTarget) -> Result<&'a Path, TargetError> {
    match &target.value {
      CookedValue::Folder(path) => Ok(path),
      other => Err(TargetError::KindMismatch {
        handler: self.kind(),
        target: target.id.clone(),
        value: other.clone(),
      }),
    }
  }
}

impl TargetHandler for FolderHandler {
  fn kind(&self) -> &'static str {
    "folder"
  }

  fn claims(&self, id: &TargetId) -> bool {
    id.as_str()
      .strip_suffix(FOLDER_TARGET_SUFFIX)
      .is_some_and(|name| !name.is_empty())
  }

  fn cook(&self, id: &TargetId, _previous: Option<&Fingerprint>) -> Result<CookedValue, TargetError> {
    let name = id.as_str().trim_end_matches(FOLDER_TARGET_SUFFIX);
    Ok(CookedValue::Folder(self.root.join(name)))
  }

  fn fingerprint(&self, target: &CookedTarget) -> Result<Option<Fingerprint>, TargetError> {
    let path = self.path_of(target)?;

    if !path.is_dir() {
      return Ok(None);
    }

    let hash = hash_tree(path).map_err(|source| TargetError::Fingerprint {
      target: target.id.clone(),
      source,
    })?;
    Ok(Some(Fingerprint(hash)))
  }

  fn clean(&self, target: &CookedTarget) -> Result<(), TargetError> {
    let path = self.path_of(target)?;

    match fs::remove_dir_all(path) {
      Ok(()) => {
        debug!(path = ?path, "removed folder");
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
