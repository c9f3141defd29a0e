use anyhow::Result;

use super::{ProjectArgs, load_runner};
use crate::output::{OutputFormat, print_info, print_json, symbols};

/// List every rule output with the rule producing it.
pub fn cmd_targets(project: &ProjectArgs, output: OutputFormat) -> Result<()> {
  let runner = load_runner(project)?;
  let targets = runner.targets();

  if output.is_json() {
    let items: Vec<_> = targets
      .iter()
      .map(|(target, rule)| serde_json::json!({ "target": target, "rule": rule }))
      .collect();
    print_json(&items)?;
    return Ok(());
  }

  if targets.is_empty() {
    print_info("No targets defined");
    return Ok(());
  }

  let width = targets.iter().map(|(t, _)| t.as_str().len()).max().unwrap_or(0);
  for (target, rule) in targets {
    println!("{:width$} {} {}", target.as_str(), symbols::ARROW, rule, width = width);
  }

  Ok(())
}
