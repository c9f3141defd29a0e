//! Error types for rule evaluation and cleanup.

use std::fmt;

use thiserror::Error;

use crate::fingerprint::FingerprintDbError;
use crate::rule::{ActionError, RuleId};
use crate::target::{TargetError, TargetId};

/// Coarse classification of a [`RunnerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// A target or rule could not be found.
  UnknownTarget,
  /// The rule graph is inconsistent: forbidden leaf or dependency cycle.
  Consistency,
  /// A rule action failed.
  Run,
  /// The rule set was rejected when building the runner.
  Configuration,
  /// A target handler failed to fingerprint, cook or clean a target.
  Target,
  /// The fingerprint database could not be opened or written.
  Store,
}

/// Chain of rule ids, rendered as `a -> b -> c`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleChain(pub Vec<RuleId>);

impl fmt::Display for RuleChain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, id) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str(" -> ")?;
      }
      write!(f, "{}", id)?;
    }
    Ok(())
  }
}

#[derive(Debug, Error)]
pub enum RunnerError {
  #[error("no rule has target `{target}` as output")]
  NoProducer { target: TargetId },

  #[error("unknown target `{target}`{}", chain_suffix(.needed_by))]
  UnknownTarget { target: TargetId, needed_by: RuleChain },

  #[error("no rule has target `{target}` as output{}", needed_by_suffix(.needed_by.as_ref()))]
  NonRuleGeneratedTarget { target: TargetId, needed_by: Option<RuleId> },

  #[error("recursion detected in rules {chain}")]
  Cycle { chain: RuleChain },

  #[error("error in rule `{rule}`: {source}")]
  Run {
    rule: RuleId,
    #[source]
    source: ActionError,
  },

  #[error("target `{target}` is produced by both `{first}` and `{second}`")]
  DuplicateOutput {
    target: TargetId,
    first: RuleId,
    second: RuleId,
  },

  #[error("rule id `{0}` is declared more than once")]
  DuplicateRule(RuleId),

  #[error("target `{target}`: {source}")]
  Target {
    target: TargetId,
    #[source]
    source: TargetError,
  },

  #[error(transparent)]
  Store(#[from] FingerprintDbError),
}

fn needed_by_suffix(rule: Option<&RuleId>) -> String {
  rule.map(|r| format!(" (needed by rule `{}`)", r)).unwrap_or_default()
}

fn chain_suffix(chain: &RuleChain) -> String {
  if chain.0.is_empty() {
    String::new()
  } else {
    format!(" (needed by {})", chain)
  }
}

impl RunnerError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      RunnerError::NoProducer { .. } | RunnerError::UnknownTarget { .. } => ErrorKind::UnknownTarget,
      RunnerError::NonRuleGeneratedTarget { .. } | RunnerError::Cycle { .. } => ErrorKind::Consistency,
      RunnerError::Run { .. } => ErrorKind::Run,
      RunnerError::DuplicateOutput { .. } | RunnerError::DuplicateRule(_) => ErrorKind::Configuration,
      RunnerError::Target { .. } => ErrorKind::Target,
      RunnerError::Store(_) => ErrorKind::Store,
    }
  }

  /// Wrap a handler failure, turning "no handler" into an unknown target.
  pub(crate) fn from_target(target: &TargetId, chain: RuleChain, source: TargetError) -> Self {
    match source {
      TargetError::NoHandler(_) => RunnerError::UnknownTarget {
        target: target.clone(),
        needed_by: chain,
      },
      source => RunnerError::Target {
        target: target.clone(),
        source,
      },
    }
  }
}
