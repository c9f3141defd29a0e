//! Implementation of the `isg run` command.

use std::time::Instant;

use anyhow::{Context, Result};

use isengard_lib::target::TargetId;

use super::{ProjectArgs, load_runner};
use crate::output::{OutputFormat, format_duration, print_info, print_json, print_stat, print_success, symbols};

/// Bring `target` up to date and print what happened.
pub fn cmd_run(project: &ProjectArgs, target: &str, output: OutputFormat) -> Result<()> {
  let start = Instant::now();
  let runner = load_runner(project)?;
  let target = TargetId::new(target);

  let report = runner
    .run_with_report(&target)
    .with_context(|| format!("Failed to build `{}`", target))?;

  if output.is_json() {
    print_json(&serde_json::json!({
      "target": target,
      "changed": report.changed,
      "executed": report.executed,
      "recorded": report.recorded,
    }))?;
    return Ok(());
  }

  if report.changed {
    print_success(&format!("Built {}", target));
  } else {
    print_info(&format!("{} is up to date", target));
  }

  for rule in &report.executed {
    println!("  {} {}", symbols::ARROW, rule);
  }
  print_stat("Rules executed", &report.executed.len().to_string());
  print_stat("Fingerprints recorded", &report.recorded.to_string());
  print_stat("Duration", &format_duration(start.elapsed()));

  Ok(())
}
