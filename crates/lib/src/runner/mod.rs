//! Incremental rule evaluation.
//!
//! The [`Runner`] owns a resolved rule set and answers two requests:
//!
//! - [`Runner::run`] brings a target up to date, executing only the rules
//!   whose inputs or outputs changed since the fingerprints were recorded.
//! - [`Runner::clean`] removes every artifact produced on the way to a target.
//!
//! Both open the fingerprint database for the duration of the call. Each
//! `run` call starts from an empty evaluation cache, so a rule executes at
//! most once per call and nothing leaks between calls except through the
//! database.

mod clean;
mod eval;
mod types;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Config;
use crate::fingerprint::FingerprintDb;
use crate::manifest::Manifest;
use crate::rule::{ResolvedRule, RuleId};
use crate::target::{TargetHandlers, TargetId};

use clean::Cleaner;
use eval::Evaluation;

pub use types::{ErrorKind, RuleChain, RunnerError};

/// Outcome of a [`Runner::run_with_report`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
  /// Whether the requested target or any of its dependencies changed.
  pub changed: bool,
  /// Rules whose action ran, in execution order.
  pub executed: Vec<RuleId>,
  /// Fingerprint records written to the database.
  pub recorded: usize,
}

/// Outcome of a [`Runner::clean_with_report`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
  /// Rules whose outputs were cleaned, in walk order.
  pub cleaned: Vec<RuleId>,
}

#[derive(Debug)]
pub struct Runner {
  rules: Vec<ResolvedRule>,
  target_to_rule: HashMap<TargetId, usize>,
  consumers: HashMap<TargetId, Vec<usize>>,
  config: Config,
  handlers: TargetHandlers,
  db_path: PathBuf,
}

impl Runner {
  /// Index `rules` by output.
  ///
  /// # Errors
  ///
  /// Returns `DuplicateOutput` if two rules (or one rule twice) claim the same
  /// output, and `DuplicateRule` if two rules share an id.
  pub fn new(
    rules: impl IntoIterator<Item = ResolvedRule>,
    config: Config,
    handlers: TargetHandlers,
    db_path: impl Into<PathBuf>,
  ) -> Result<Self, RunnerError> {
    let rules: Vec<ResolvedRule> = rules.into_iter().collect();
    let mut target_to_rule: HashMap<TargetId, usize> = HashMap::new();
    let mut consumers: HashMap<TargetId, Vec<usize>> = HashMap::new();
    let mut ids = HashSet::new();

    for (index, rule) in rules.iter().enumerate() {
      if !ids.insert(&rule.id) {
        return Err(RunnerError::DuplicateRule(rule.id.clone()));
      }

      for output in &rule.outputs {
        if let Some(&first) = target_to_rule.get(output) {
          return Err(RunnerError::DuplicateOutput {
            target: output.clone(),
            first: rules[first].id.clone(),
            second: rule.id.clone(),
          });
        }
        target_to_rule.insert(output.clone(), index);
      }

      for input in &rule.inputs {
        let entry = consumers.entry(input.clone()).or_default();
        if !entry.contains(&index) {
          entry.push(index);
        }
      }
    }

    Ok(Self {
      rules,
      target_to_rule,
      consumers,
      config,
      handlers,
      db_path: db_path.into(),
    })
  }

  /// Runner over a loaded rules file, with the default handlers rooted at the
  /// file's directory.
  pub fn from_manifest(manifest: Manifest, db_path: impl Into<PathBuf>) -> Result<Self, RunnerError> {
    let handlers = TargetHandlers::with_defaults(&manifest.root);
    Self::new(manifest.rules, manifest.config, handlers, db_path)
  }

  pub fn rules(&self) -> &[ResolvedRule] {
    &self.rules
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn db_path(&self) -> &Path {
    &self.db_path
  }

  /// The rule producing `target`, if any.
  pub fn rule_for(&self, target: &TargetId) -> Option<&ResolvedRule> {
    self.target_to_rule.get(target).map(|&index| &self.rules[index])
  }

  /// Rules listing `target` among their inputs.
  pub(crate) fn consumers_of<'a>(&'a self, target: &TargetId) -> impl Iterator<Item = &'a ResolvedRule> + 'a {
    self
      .consumers
      .get(target)
      .into_iter()
      .flatten()
      .map(|&index| &self.rules[index])
  }

  /// Every rule output with the rule producing it, sorted by target.
  pub fn targets(&self) -> Vec<(&TargetId, &RuleId)> {
    let mut targets: Vec<_> = self
      .target_to_rule
      .iter()
      .map(|(target, &index)| (target, &self.rules[index].id))
      .collect();
    targets.sort();
    targets
  }

  /// Bring `target` up to date and report whether it changed.
  pub fn run(&self, target: &TargetId) -> Result<bool, RunnerError> {
    self.run_with_report(target).map(|report| report.changed)
  }

  /// Like [`Runner::run`], also reporting which rules executed.
  ///
  /// Fresh fingerprints are committed only if the whole evaluation succeeds.
  pub fn run_with_report(&self, target: &TargetId) -> Result<RunReport, RunnerError> {
    let mut db = FingerprintDb::connect(&self.db_path)?;

    let (changed, executed, updates) = {
      let mut evaluation = Evaluation::new(self, &db);
      let changed = evaluation.evaluate(target)?.changed;
      let (executed, updates) = evaluation.finish();
      (changed, executed, updates)
    };

    for (id, fingerprint) in updates {
      db.stage(id, fingerprint);
    }
    let recorded = db.commit()?;

    info!(target = %target, changed, executed = executed.len(), "run complete");

    Ok(RunReport {
      changed,
      executed,
      recorded,
    })
  }

  /// Remove the artifacts of the rule producing `target` and of every rule
  /// it transitively depends on.
  pub fn clean(&self, target: &TargetId) -> Result<(), RunnerError> {
    self.clean_with_report(target).map(|_| ())
  }

  pub fn clean_with_report(&self, target: &TargetId) -> Result<CleanReport, RunnerError> {
    let rule = self
      .rule_for(target)
      .ok_or_else(|| RunnerError::NoProducer { target: target.clone() })?;

    let mut db = FingerprintDb::connect(&self.db_path)?;

    let (cleaned, forgotten) = {
      let mut cleaner = Cleaner::new(self, &db);
      cleaner.clean_rule(rule, &[])?;
      cleaner.finish()
    };

    for id in forgotten {
      db.forget(id);
    }
    db.commit()?;

    info!(target = %target, rules = cleaned.len(), "clean complete");

    Ok(CleanReport { cleaned })
  }
}
