use super::{CookedTarget, CookedValue, Fingerprint, TargetError, TargetHandler, TargetId};
use crate::consts::VIRTUAL_TARGET_PREFIX;

/// Fingerprint recorded for every virtual target once its rule has run.
const VIRTUAL_FINGERPRINT: &str = "virtual";

/// Named targets with no artifact behind them, spelled `@name`.
///
/// They only exist as rule outputs, so a virtual leaf is a consistency error.
/// Once recorded they stay up to date until one of their inputs changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualHandler;

impl TargetHandler for VirtualHandler {
  fn kind(&self) -> &'static str {
    "virtual"
  }

  fn claims(&self, id: &TargetId) -> bool {
    id.as_str()
      .strip_prefix(VIRTUAL_TARGET_PREFIX)
      .is_some_and(|name| !name.is_empty())
  }

  fn cook(&self, id: &TargetId, _previous: Option<&Fingerprint>) -> Result<CookedValue, TargetError> {
    let name = id.as_str().trim_start_matches(VIRTUAL_TARGET_PREFIX);
    Ok(CookedValue::Virtual(name.to_string()))
  }

  fn fingerprint(&self, _target: &CookedTarget) -> Result<Option<Fingerprint>, TargetError> {
    Ok(Some(Fingerprint(VIRTUAL_FINGERPRINT.to_string())))
  }

  fn clean(&self, _target: &CookedTarget) -> Result<(), TargetError> {
    Ok(())
  }

  fn allows_non_rule_generated_target(&self) -> bool {
    false
  }
}
