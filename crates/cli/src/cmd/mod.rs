mod clean;
mod run;
mod targets;

pub use clean::cmd_clean;
pub use run::cmd_run;
pub use targets::cmd_targets;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use isengard_lib::config::{ConstValue, parse_override};
use isengard_lib::consts::{DEFAULT_DB_FILENAME, DEFAULT_RULES_FILENAME};
use isengard_lib::manifest::Manifest;
use isengard_lib::runner::Runner;

/// Options locating the rules file and fingerprint database.
#[derive(Debug, Args)]
pub struct ProjectArgs {
  /// Rules file to load
  #[arg(long, global = true, env = "ISENGARD_RULES", default_value = DEFAULT_RULES_FILENAME)]
  pub rules: PathBuf,

  /// Fingerprint database (default: .isengard.db next to the rules file)
  #[arg(long, global = true, env = "ISENGARD_DB")]
  pub db: Option<PathBuf>,

  /// Override a config value, parsed as bool, integer, float or string
  #[arg(long = "set", value_name = "KEY=VALUE", global = true, value_parser = parse_override)]
  pub overrides: Vec<(String, ConstValue)>,
}

/// Load the rules file and build a runner over it.
pub fn load_runner(project: &ProjectArgs) -> Result<Runner> {
  let rules = dunce::canonicalize(&project.rules)
    .with_context(|| format!("Rules file not found: {}", project.rules.display()))?;

  let mut manifest = Manifest::load(&rules)?;
  manifest.apply_overrides(project.overrides.iter().cloned());

  let db = match &project.db {
    Some(db) => db.clone(),
    None => manifest.root.join(DEFAULT_DB_FILENAME),
  };

  debug!(rules = ?rules, db = ?db, "loading runner");
  let runner = Runner::from_manifest(manifest, db).context("Invalid rule set")?;
  Ok(runner)
}
