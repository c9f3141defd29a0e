//! Depth-first evaluation behind [`Runner::run`](super::Runner::run).

use std::collections::HashMap;

use tracing::{debug, info};

use super::Runner;
use super::types::{RuleChain, RunnerError};
use crate::fingerprint::FingerprintDb;
use crate::rule::{ResolvedRule, RuleId};
use crate::target::{CookedTarget, Fingerprint, TargetHandler, TargetId};

/// Cached result for one target.
#[derive(Debug, Clone)]
pub(super) struct Evaluated<'r> {
  pub cooked: CookedTarget,
  pub handler: &'r dyn TargetHandler,
  pub changed: bool,
}

/// State of a single `run` call.
///
/// A target present in `cache` is never evaluated again in this call, which
/// is what limits every rule to one execution. `chain` holds the rules
/// currently being evaluated, innermost last.
pub(super) struct Evaluation<'r> {
  runner: &'r Runner,
  db: &'r FingerprintDb,
  cache: HashMap<TargetId, Evaluated<'r>>,
  chain: Vec<&'r ResolvedRule>,
  executed: Vec<RuleId>,
  staged: Vec<(TargetId, Option<Fingerprint>)>,
}

impl<'r> Evaluation<'r> {
  pub fn new(runner: &'r Runner, db: &'r FingerprintDb) -> Self {
    Self {
      runner,
      db,
      cache: HashMap::new(),
      chain: Vec::new(),
      executed: Vec::new(),
      staged: Vec::new(),
    }
  }

  pub fn evaluate(&mut self, target: &TargetId) -> Result<Evaluated<'r>, RunnerError> {
    if let Some(hit) = self.cache.get(target) {
      debug!(target = %target, kind = hit.handler.kind(), changed = hit.changed, "cache hit");
      return Ok(hit.clone());
    }

    let runner = self.runner;
    match runner.rule_for(target) {
      None => self.evaluate_leaf(target),
      Some(rule) => {
        self.evaluate_rule(rule)?;
        self.cache.get(target).cloned().ok_or_else(|| RunnerError::NoProducer {
          target: target.clone(),
        })
      }
    }
  }

  fn chain_ids(&self) -> RuleChain {
    RuleChain(self.chain.iter().map(|r| r.id.clone()).collect())
  }

  fn cook(
    &self,
    target: &TargetId,
    previous: Option<&Fingerprint>,
  ) -> Result<(CookedTarget, &'r dyn TargetHandler), RunnerError> {
    let runner = self.runner;
    runner
      .handlers
      .cook_target(target, previous)
      .map_err(|e| RunnerError::from_target(target, self.chain_ids(), e))
  }

  fn evaluate_leaf(&mut self, target: &TargetId) -> Result<Evaluated<'r>, RunnerError> {
    let previous = self.db.fetch_previous_fingerprint(target);
    let (cooked, handler) = self.cook(target, previous.as_ref())?;

    if !handler.allows_non_rule_generated_target() {
      return Err(RunnerError::NonRuleGeneratedTarget {
        target: target.clone(),
        needed_by: self.chain.last().map(|r| r.id.clone()),
      });
    }

    let changed = match &previous {
      Some(fingerprint) => handler
        .need_rebuild(&cooked, fingerprint)
        .map_err(|e| RunnerError::from_target(target, self.chain_ids(), e))?,
      None => true,
    };
    debug!(target = %target, kind = handler.kind(), changed, "evaluated leaf");

    if changed {
      let fresh = handler
        .fingerprint(&cooked)
        .map_err(|e| RunnerError::from_target(target, self.chain_ids(), e))?;
      self.staged.push((target.clone(), fresh));
    }

    let entry = Evaluated {
      cooked,
      handler,
      changed,
    };
    self.cache.insert(target.clone(), entry.clone());
    Ok(entry)
  }

  /// Evaluate `rule` and cache every one of its outputs.
  fn evaluate_rule(&mut self, rule: &'r ResolvedRule) -> Result<(), RunnerError> {
    if self.chain.iter().any(|r| r.id == rule.id) {
      let mut chain = self.chain_ids();
      chain.0.push(rule.id.clone());
      return Err(RunnerError::Cycle { chain });
    }

    self.chain.push(rule);

    let mut rebuild_needed = false;
    let mut inputs = Vec::with_capacity(rule.inputs.len());
    for input in &rule.inputs {
      let evaluated = self.evaluate(input)?;
      rebuild_needed |= evaluated.changed;
      inputs.push(evaluated.cooked);
    }

    let mut outputs = Vec::with_capacity(rule.outputs.len());
    let mut handlers = Vec::with_capacity(rule.outputs.len());
    for output in &rule.outputs {
      let previous = self.db.fetch_previous_fingerprint(output);
      let (cooked, handler) = self.cook(output, previous.as_ref())?;

      match &previous {
        Some(fingerprint) => {
          rebuild_needed |= handler
            .need_rebuild(&cooked, fingerprint)
            .map_err(|e| RunnerError::from_target(output, self.chain_ids(), e))?;
        }
        None => rebuild_needed = true,
      }

      outputs.push(cooked);
      handlers.push(handler);
    }

    if rebuild_needed {
      info!(rule = %rule.id, "running rule");
      rule
        .action
        .run(&outputs, &inputs, &self.runner.config)
        .map_err(|source| RunnerError::Run {
          rule: rule.id.clone(),
          source,
        })?;
      self.executed.push(rule.id.clone());

      for (cooked, handler) in outputs.iter().zip(&handlers) {
        let fresh = handler
          .fingerprint(cooked)
          .map_err(|e| RunnerError::from_target(&cooked.id, self.chain_ids(), e))?;
        self.staged.push((cooked.id.clone(), fresh));
      }
    } else {
      debug!(rule = %rule.id, "rule is up to date");
    }

    self.chain.pop();

    for (cooked, handler) in outputs.into_iter().zip(handlers) {
      self.cache.insert(
        cooked.id.clone(),
        Evaluated {
          cooked,
          handler,
          changed: rebuild_needed,
        },
      );
    }

    Ok(())
  }

  /// Executed rules and the fingerprint updates to commit.
  ///
  /// Rules consuming a target that changed in this call, but that were not
  /// evaluated themselves, have their output records dropped so they rebuild
  /// the next time they are requested. This holds whether or not the
  /// target's fingerprint differs: a virtual output keeps the same
  /// fingerprint every time its rule runs.
  pub fn finish(self) -> (Vec<RuleId>, Vec<(TargetId, Option<Fingerprint>)>) {
    let mut updates = self.staged;

    let mut changed: Vec<&TargetId> = self
      .cache
      .iter()
      .filter(|(_, entry)| entry.changed)
      .map(|(id, _)| id)
      .collect();
    changed.sort();

    for id in changed {
      for consumer in self.runner.consumers_of(id) {
        if consumer.outputs.iter().any(|o| self.cache.contains_key(o)) {
          continue;
        }
        debug!(rule = %consumer.id, input = %id, "invalidating rule not evaluated in this run");
        for output in &consumer.outputs {
          updates.push((output.clone(), None));
        }
      }
    }

    (self.executed, updates)
  }
}
