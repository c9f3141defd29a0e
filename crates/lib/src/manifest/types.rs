//! Serialized form of a rules file.
//!
//! ```json
//! {
//!   "config": { "cc": "gcc", "opt": 2 },
//!   "rules": [
//!     { "id": "compile", "inputs": ["src/main.c"], "outputs": ["build/main.o"],
//!       "cmd": "$${config:cc} -c $${in:0} -o $${out:0}" },
//!     { "id": "all", "inputs": ["build/main.o"], "outputs": ["@all"] }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Config;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesFile {
  #[serde(default)]
  pub config: Config,
  #[serde(default)]
  pub rules: Vec<RuleDef>,
}

/// One rule as written in the rules file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDef {
  pub id: String,
  #[serde(default)]
  pub inputs: Vec<String>,
  pub outputs: Vec<String>,
  /// Shell command; a rule without one does nothing when it runs.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cmd: Option<String>,
  /// Shell running `cmd` instead of `/bin/sh` (`cmd.exe` on Windows).
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub shell: Option<String>,
  /// Extra environment variables for `cmd`.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,
}
