//! Implementation of the `isg clean` command.

use anyhow::{Context, Result};

use isengard_lib::target::TargetId;

use super::{ProjectArgs, load_runner};
use crate::output::{OutputFormat, print_json, print_stat, print_success, symbols};

pub fn cmd_clean(project: &ProjectArgs, target: &str, output: OutputFormat) -> Result<()> {
  let runner = load_runner(project)?;
  let target = TargetId::new(target);

  let report = runner
    .clean_with_report(&target)
    .with_context(|| format!("Failed to clean `{}`", target))?;

  if output.is_json() {
    print_json(&serde_json::json!({
      "target": target,
      "cleaned": report.cleaned,
    }))?;
  } else {
    print_success(&format!("Cleaned {}", target));
    for rule in &report.cleaned {
      println!("  {} {}", symbols::MINUS, rule);
    }
    print_stat("Rules cleaned", &report.cleaned.len().to_string());
  }

  Ok(())
}
