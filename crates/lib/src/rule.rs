//! Resolved build rules.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::target::{CookedTarget, TargetId};

/// Failure raised by a rule action. Any error type can be boxed into it.
pub type ActionError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Identifier of a rule, used in diagnostics and cycle reports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for RuleId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for RuleId {
  fn from(id: &str) -> Self {
    Self(id.to_string())
  }
}

/// The side-effecting work of a rule.
///
/// Receives cooked outputs first, then cooked inputs, both in declared order.
pub trait RuleAction: Send + Sync {
  fn run(&self, outputs: &[CookedTarget], inputs: &[CookedTarget], config: &Config) -> Result<(), ActionError>;
}

impl<F> RuleAction for F
where
  F: Fn(&[CookedTarget], &[CookedTarget], &Config) -> Result<(), ActionError> + Send + Sync,
{
  fn run(&self, outputs: &[CookedTarget], inputs: &[CookedTarget], config: &Config) -> Result<(), ActionError> {
    self(outputs, inputs, config)
  }
}

/// Pin a closure to the [`RuleAction`] signature so its argument and return
/// types are inferred.
///
/// ```
/// use isengard_lib::rule::{ResolvedRule, action_fn};
///
/// let rule = ResolvedRule::new(
///   "touch",
///   Vec::<&str>::new(),
///   ["@done"],
///   action_fn(|outputs, _inputs, _config| {
///     println!("building {}", outputs[0].id);
///     Ok(())
///   }),
/// );
/// assert_eq!(rule.id.as_str(), "touch");
/// ```
pub fn action_fn<F>(f: F) -> F
where
  F: Fn(&[CookedTarget], &[CookedTarget], &Config) -> Result<(), ActionError> + Send + Sync,
{
  f
}

/// Action that does nothing, for rules that only group other targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAction;

impl RuleAction for NoopAction {
  fn run(&self, _outputs: &[CookedTarget], _inputs: &[CookedTarget], _config: &Config) -> Result<(), ActionError> {
    Ok(())
  }
}

/// An immutable build step.
#[derive(Clone)]
pub struct ResolvedRule {
  pub id: RuleId,
  pub inputs: Vec<TargetId>,
  pub outputs: Vec<TargetId>,
  pub action: Arc<dyn RuleAction>,
}

impl ResolvedRule {
  pub fn new<I, O>(id: impl Into<String>, inputs: I, outputs: O, action: impl RuleAction + 'static) -> Self
  where
    I: IntoIterator,
    I::Item: Into<TargetId>,
    O: IntoIterator,
    O::Item: Into<TargetId>,
  {
    Self {
      id: RuleId::new(id),
      inputs: inputs.into_iter().map(Into::into).collect(),
      outputs: outputs.into_iter().map(Into::into).collect(),
      action: Arc::new(action),
    }
  }
}

impl fmt::Debug for ResolvedRule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ResolvedRule")
      .field("id", &self.id)
      .field("inputs", &self.inputs)
      .field("outputs", &self.outputs)
      .finish_non_exhaustive()
  }
}
