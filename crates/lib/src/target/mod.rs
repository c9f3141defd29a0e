//! Target identifiers, fingerprints and the handler bundle.
//!
//! A target is anything a rule can produce or consume. What it physically is
//! depends on its handler: the bundle picks one handler per identifier and the
//! handler "cooks" the identifier into a concrete value (a path, a name) that
//! rule actions and fingerprint checks work with.
//!
//! Handler selection is a registration lookup: handlers are asked in
//! registration order whether they claim an identifier and the first one that
//! does wins. [`TargetHandlers::with_defaults`] registers the built-in kinds:
//!
//! | Spelling        | Handler | Leaf allowed |
//! |-----------------|---------|--------------|
//! | `@name`         | virtual | no           |
//! | `some/dir/`     | folder  | yes          |
//! | anything else   | file    | yes          |

mod file;
mod folder;
mod virtual_target;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::hash::HashError;

pub use file::FileHandler;
pub use folder::FolderHandler;
pub use virtual_target::VirtualHandler;

/// Identifier of a target, unique within a build.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for TargetId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for TargetId {
  fn from(id: &str) -> Self {
    Self(id.to_string())
  }
}

impl From<String> for TargetId {
  fn from(id: String) -> Self {
    Self(id)
  }
}

/// Opaque, handler-defined snapshot of a target's observable state.
///
/// Two fingerprints are only comparable when produced by the same handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Handler-specific materialization of a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookedValue {
  File(PathBuf),
  Folder(PathBuf),
  Virtual(String),
}

impl CookedValue {
  /// Filesystem location of the target, if it has one.
  pub fn path(&self) -> Option<&Path> {
    match self {
      CookedValue::File(path) | CookedValue::Folder(path) => Some(path),
      CookedValue::Virtual(_) => None,
    }
  }
}

impl fmt::Display for CookedValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CookedValue::File(path) | CookedValue::Folder(path) => write!(f, "{}", path.display()),
      CookedValue::Virtual(name) => f.write_str(name),
    }
  }
}

/// A target identifier together with its cooked value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookedTarget {
  pub id: TargetId,
  pub value: CookedValue,
}

#[derive(Debug, Error)]
pub enum TargetError {
  #[error("no target handler claims `{0}`")]
  NoHandler(TargetId),

  #[error("{handler} handler cannot operate on `{target}` ({value:?})")]
  KindMismatch {
    handler: &'static str,
    target: TargetId,
    value: CookedValue,
  },

  #[error("failed to fingerprint `{target}`: {source}")]
  Fingerprint {
    target: TargetId,
    #[source]
    source: HashError,
  },

  #[error("failed to inspect {path}: {source}")]
  Stat {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to clean {path}: {source}")]
  Clean {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Behavior shared by every target kind.
pub trait TargetHandler: fmt::Debug + Send + Sync {
  /// Short name used in logs and errors.
  fn kind(&self) -> &'static str;

  /// Whether this handler is responsible for `id`.
  fn claims(&self, id: &TargetId) -> bool;

  /// Resolve an identifier into its concrete value.
  fn cook(&self, id: &TargetId, previous: Option<&Fingerprint>) -> Result<CookedValue, TargetError>;

  /// Compute the current fingerprint, `None` if the target does not exist.
  fn fingerprint(&self, target: &CookedTarget) -> Result<Option<Fingerprint>, TargetError>;

  /// Whether the target's current state differs from `previous`.
  ///
  /// Must not have side effects: the runner calls it while deciding staleness.
  fn need_rebuild(&self, target: &CookedTarget, previous: &Fingerprint) -> Result<bool, TargetError> {
    Ok(self.fingerprint(target)?.as_ref() != Some(previous))
  }

  /// Remove or invalidate the artifact behind the target.
  fn clean(&self, target: &CookedTarget) -> Result<(), TargetError>;

  /// Whether the target may exist without any rule producing it.
  fn allows_non_rule_generated_target(&self) -> bool;
}

/// Ordered set of handlers consulted by [`TargetHandlers::cook_target`].
#[derive(Debug, Default)]
pub struct TargetHandlers {
  handlers: Vec<Box<dyn TargetHandler>>,
}

impl TargetHandlers {
  /// An empty bundle; every lookup fails until handlers are registered.
  pub fn new() -> Self {
    Self::default()
  }

  /// Bundle with the virtual, folder and file handlers, resolving paths
  /// relative to `root`.
  pub fn with_defaults(root: impl Into<PathBuf>) -> Self {
    let root = root.into();
    let mut handlers = Self::new();
    handlers
      .register(VirtualHandler)
      .register(FolderHandler::new(root.clone()))
      .register(FileHandler::new(root));
    handlers
  }

  /// Append a handler. Earlier registrations take precedence.
  pub fn register(&mut self, handler: impl TargetHandler + 'static) -> &mut Self {
    self.handlers.push(Box::new(handler));
    self
  }

  /// Handler responsible for `id`.
  pub fn handler_for(&self, id: &TargetId) -> Result<&dyn TargetHandler, TargetError> {
    self
      .handlers
      .iter()
      .find(|h| h.claims(id))
      .map(|h| h.as_ref())
      .ok_or_else(|| TargetError::NoHandler(id.clone()))
  }

  /// Cook `id` and return it along with the handler that owns it.
  pub fn cook_target(
    &self,
    id: &TargetId,
    previous: Option<&Fingerprint>,
  ) -> Result<(CookedTarget, &dyn TargetHandler), TargetError> {
    let handler = self.handler_for(id)?;
    let value = handler.cook(id, previous)?;
    Ok((CookedTarget { id: id.clone(), value }, handler))
  }
}
