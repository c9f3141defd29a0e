//! Recursive artifact removal behind [`Runner::clean`](super::Runner::clean).

use std::collections::HashSet;

use tracing::info;

use super::Runner;
use super::types::{RuleChain, RunnerError};
use crate::fingerprint::FingerprintDb;
use crate::rule::{ResolvedRule, RuleId};
use crate::target::TargetId;

pub(super) struct Cleaner<'r> {
  runner: &'r Runner,
  db: &'r FingerprintDb,
  cleaned: HashSet<&'r RuleId>,
  order: Vec<RuleId>,
  forgotten: Vec<TargetId>,
}

impl<'r> Cleaner<'r> {
  pub fn new(runner: &'r Runner, db: &'r FingerprintDb) -> Self {
    Self {
      runner,
      db,
      cleaned: HashSet::new(),
      order: Vec::new(),
      forgotten: Vec::new(),
    }
  }

  /// Clean `rule`'s outputs, then recurse into the rules producing its
  /// inputs. `ancestors` is the path of rules that led here.
  pub fn clean_rule(&mut self, rule: &'r ResolvedRule, ancestors: &[&'r ResolvedRule]) -> Result<(), RunnerError> {
    if !self.cleaned.insert(&rule.id) {
      return Ok(());
    }

    let mut path = ancestors.to_vec();
    path.push(rule);
    let chain = || RuleChain(path.iter().map(|r| r.id.clone()).collect());

    info!(rule = %rule.id, "cleaning rule");
    self.order.push(rule.id.clone());

    let runner = self.runner;
    for output in &rule.outputs {
      let previous = self.db.fetch_previous_fingerprint(output);
      let (cooked, handler) = runner
        .handlers
        .cook_target(output, previous.as_ref())
        .map_err(|e| RunnerError::from_target(output, chain(), e))?;

      handler
        .clean(&cooked)
        .map_err(|e| RunnerError::from_target(output, chain(), e))?;
      self.forgotten.push(output.clone());
    }

    for input in &rule.inputs {
      // Leaves are never cleaned.
      let Some(producer) = runner.rule_for(input) else {
        continue;
      };

      if path.iter().any(|r| r.id == producer.id) {
        let mut cycle = chain();
        cycle.0.push(producer.id.clone());
        return Err(RunnerError::Cycle { chain: cycle });
      }

      self.clean_rule(producer, &path)?;
    }

    Ok(())
  }

  /// Cleaned rules in walk order and the targets whose records to drop.
  pub fn finish(self) -> (Vec<RuleId>, Vec<TargetId>) {
    (self.order, self.forgotten)
  }
}
