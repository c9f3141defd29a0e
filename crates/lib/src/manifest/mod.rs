//! Rules file loading.
//!
//! A rules file is a JSON document holding the build configuration and a list
//! of rules. Loading it resolves every rule into a [`ResolvedRule`] whose
//! action runs the rule's shell command from the file's directory.

mod types;

pub use types::*;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::action::CmdAction;
use crate::config::{Config, ConstValue};
use crate::rule::{NoopAction, ResolvedRule};

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read rules file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse rules file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("rule #{0} has an empty id")]
  EmptyRuleId(usize),

  #[error("rule `{0}` has no outputs")]
  NoOutputs(String),
}

/// Resolved contents of a rules file.
#[derive(Debug)]
pub struct Manifest {
  /// Directory target paths and commands are relative to.
  pub root: PathBuf,
  pub config: Config,
  pub rules: Vec<ResolvedRule>,
}

impl Manifest {
  /// Load and resolve the rules file at `path`.
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let file: RulesFile = serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    let root = match path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
      _ => PathBuf::from("."),
    };

    debug!(path = ?path, rules = file.rules.len(), "loaded rules file");
    Self::resolve(file, root)
  }

  /// Resolve an already parsed rules file against `root`.
  pub fn resolve(file: RulesFile, root: impl Into<PathBuf>) -> Result<Self, ManifestError> {
    let root = root.into();
    let mut rules = Vec::with_capacity(file.rules.len());

    for (index, def) in file.rules.into_iter().enumerate() {
      if def.id.is_empty() {
        return Err(ManifestError::EmptyRuleId(index));
      }
      if def.outputs.is_empty() {
        return Err(ManifestError::NoOutputs(def.id));
      }

      let rule = match def.cmd {
        Some(cmd) => {
          let mut action = CmdAction::new(cmd, &root);
          action.env = def.env;
          action.shell = def.shell;
          ResolvedRule::new(def.id, def.inputs, def.outputs, action)
        }
        None => ResolvedRule::new(def.id, def.inputs, def.outputs, NoopAction),
      };
      rules.push(rule);
    }

    Ok(Self {
      root,
      config: file.config,
      rules,
    })
  }

  /// Override configuration values, replacing existing keys.
  pub fn apply_overrides(&mut self, overrides: impl IntoIterator<Item = (String, ConstValue)>) {
    self.config.extend(overrides);
  }
}
