use std::error::Error as _;
use std::fs;

use isengard_lib::config::{Config, ConstValue};
use isengard_lib::rule::{ResolvedRule, action_fn};
use isengard_lib::runner::{ErrorKind, Runner, RunnerError};
use isengard_lib::target::TargetHandlers;

use super::common::{Project, target};

#[test]
fn first_run_builds_chain_in_dependency_order() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(project.chain_rules());

  let report = runner.run_with_report(&target("build/c.txt")).unwrap();

  assert!(report.changed);
  assert_eq!(project.take_executed(), ["copy", "final"]);
  assert_eq!(report.recorded, 3);
  assert_eq!(project.read("build/c.txt"), "alpha\n");
}

#[test]
fn second_run_is_a_no_op() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(project.chain_rules());

  assert!(runner.run(&target("build/c.txt")).unwrap());
  project.take_executed();

  let report = runner.run_with_report(&target("build/c.txt")).unwrap();
  assert!(!report.changed);
  assert!(report.executed.is_empty());
  assert_eq!(report.recorded, 0);
  assert!(project.take_executed().is_empty());
}

#[test]
fn changed_leaf_rebuilds_everything_downstream() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(project.chain_rules());
  runner.run(&target("build/c.txt")).unwrap();
  project.take_executed();

  project.write("src/a.txt", "beta\n");

  assert!(runner.run(&target("build/c.txt")).unwrap());
  assert_eq!(project.take_executed(), ["copy", "final"]);
  assert_eq!(project.read("build/c.txt"), "beta\n");

  assert!(!runner.run(&target("build/c.txt")).unwrap());
}

#[test]
fn tampered_intermediate_output_is_rebuilt() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(project.chain_rules());
  runner.run(&target("build/c.txt")).unwrap();
  project.take_executed();

  project.write("build/b.txt", "garbage\n");

  assert!(runner.run(&target("build/c.txt")).unwrap());
  assert_eq!(project.take_executed(), ["copy", "final"]);
  assert_eq!(project.read("build/b.txt"), "alpha\n");
}

#[test]
fn deleted_output_is_rebuilt_alone() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(project.chain_rules());
  runner.run(&target("build/c.txt")).unwrap();
  project.take_executed();

  fs::remove_file(project.path("build/c.txt")).unwrap();

  assert!(runner.run(&target("build/c.txt")).unwrap());
  assert_eq!(project.take_executed(), ["final"]);
}

#[test]
fn requesting_an_intermediate_only_runs_its_producers() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(project.chain_rules());

  assert!(runner.run(&target("build/b.txt")).unwrap());
  assert_eq!(project.take_executed(), ["copy"]);
  assert!(!project.exists("build/c.txt"));
}

#[test]
fn multi_output_rule_runs_once() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(vec![
    project.concat_rule("gen", &["src/a.txt"], &["build/x.txt", "build/y.txt"]),
    project.concat_rule("join", &["build/x.txt", "build/y.txt"], &["build/z.txt"]),
  ]);

  assert!(runner.run(&target("build/z.txt")).unwrap());
  assert_eq!(project.take_executed(), ["gen", "join"]);
  assert_eq!(project.read("build/z.txt"), "alpha\nalpha\n");
}

#[test]
fn shared_input_is_checked_once_per_run() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(vec![
    project.concat_rule("left", &["src/a.txt"], &["build/left.txt"]),
    project.concat_rule("right", &["src/a.txt"], &["build/right.txt"]),
    project.concat_rule("top", &["build/left.txt", "build/right.txt"], &["build/top.txt"]),
  ]);
  runner.run(&target("build/top.txt")).unwrap();
  project.stats.reset();

  assert!(!runner.run(&target("build/top.txt")).unwrap());
  assert_eq!(project.stats.need_rebuild_calls("src/a.txt"), 1);
  assert_eq!(project.stats.need_rebuild_calls("build/top.txt"), 1);
}

#[test]
fn every_output_is_checked_even_when_inputs_changed() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(vec![project.concat_rule(
    "gen",
    &["src/a.txt"],
    &["build/x.txt", "build/y.txt"],
  )]);
  runner.run(&target("build/x.txt")).unwrap();
  project.stats.reset();

  project.write("src/a.txt", "beta\n");
  runner.run(&target("build/x.txt")).unwrap();

  assert_eq!(project.stats.need_rebuild_calls("build/x.txt"), 1);
  assert_eq!(project.stats.need_rebuild_calls("build/y.txt"), 1);
}

#[test]
fn virtual_target_groups_rules() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let mut rules = project.chain_rules();
  rules.push(project.concat_rule("all", &["build/c.txt"], &["@all"]));
  let runner = project.runner(rules);

  assert!(runner.run(&target("@all")).unwrap());
  assert_eq!(project.take_executed(), ["copy", "final", "all"]);

  assert!(!runner.run(&target("@all")).unwrap());
  assert!(project.take_executed().is_empty());
}

#[test]
fn folder_outputs_are_fingerprinted_as_trees() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(vec![project.concat_rule("bundle", &["src/a.txt"], &["dist/"])]);

  assert!(runner.run(&target("dist/")).unwrap());
  assert_eq!(project.read("dist/content"), "alpha\n");
  assert!(!runner.run(&target("dist/")).unwrap());

  project.write("dist/stray.txt", "x");
  assert!(runner.run(&target("dist/")).unwrap());
}

#[test]
fn existing_leaf_without_record_counts_as_changed() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(Vec::new());

  assert!(runner.run(&target("src/a.txt")).unwrap());
  assert!(!runner.run(&target("src/a.txt")).unwrap());
}

#[test]
fn virtual_leaf_is_rejected_with_requesting_rule() {
  let project = Project::new();
  let runner = project.runner(vec![project.concat_rule("link", &["@missing"], &["build/app"])]);

  let err = runner.run(&target("build/app")).unwrap_err();

  assert_eq!(err.kind(), ErrorKind::Consistency);
  assert_eq!(
    err.to_string(),
    "no rule has target `@missing` as output (needed by rule `link`)"
  );
  assert!(project.take_executed().is_empty());
}

#[test]
fn requested_virtual_leaf_is_rejected_without_rule() {
  let project = Project::new();
  let runner = project.runner(Vec::new());

  let err = runner.run(&target("@nothing")).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Consistency);
  assert_eq!(err.to_string(), "no rule has target `@nothing` as output");
}

#[test]
fn unclaimed_target_is_unknown() {
  let project = Project::new();
  let runner = project.runner(vec![project.concat_rule("link", &["@"], &["build/app"])]);

  let err = runner.run(&target("build/app")).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::UnknownTarget);
  assert!(matches!(err, RunnerError::UnknownTarget { .. }));
  assert_eq!(err.to_string(), "unknown target `@` (needed by link)");
}

#[test]
fn empty_handler_bundle_knows_no_target() {
  let project = Project::new();
  let runner = Runner::new(Vec::new(), Config::new(), TargetHandlers::new(), project.db_path()).unwrap();

  let err = runner.run(&target("src/a.txt")).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::UnknownTarget);
}

#[test]
fn dependency_cycle_is_reported() {
  let project = Project::new();
  let runner = project.runner(vec![
    project.concat_rule("a", &["build/b.txt"], &["build/a.txt"]),
    project.concat_rule("b", &["build/a.txt"], &["build/b.txt"]),
  ]);

  let err = runner.run(&target("build/a.txt")).unwrap_err();

  assert_eq!(err.kind(), ErrorKind::Consistency);
  assert_eq!(err.to_string(), "recursion detected in rules a -> b -> a");
  assert!(project.take_executed().is_empty());
}

#[test]
fn failed_action_names_rule_and_keeps_cause() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(vec![
    project.concat_rule("copy", &["src/a.txt"], &["build/b.txt"]),
    project.failing_rule("final", &["build/b.txt"], &["build/c.txt"]),
  ]);

  let err = runner.run(&target("build/c.txt")).unwrap_err();

  assert_eq!(err.kind(), ErrorKind::Run);
  assert_eq!(err.to_string(), "error in rule `final`: compiler exploded");
  assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("compiler exploded"));
}

#[test]
fn failed_run_records_nothing() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let failing = project.runner(vec![
    project.concat_rule("copy", &["src/a.txt"], &["build/b.txt"]),
    project.failing_rule("final", &["build/b.txt"], &["build/c.txt"]),
  ]);

  assert!(failing.run(&target("build/c.txt")).is_err());
  assert_eq!(project.take_executed(), ["copy", "final"]);
  assert!(!project.db_path().exists());

  let fixed = project.runner(project.chain_rules());
  assert!(fixed.run(&target("build/c.txt")).unwrap());
  assert_eq!(project.take_executed(), ["copy", "final"]);
}

#[test]
fn failed_rule_is_retried_on_the_next_run() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(vec![project.failing_rule("final", &["src/a.txt"], &["build/c.txt"])]);

  assert!(runner.run(&target("build/c.txt")).is_err());
  assert!(runner.run(&target("build/c.txt")).is_err());
  assert_eq!(project.take_executed(), ["final", "final"]);
}

#[test]
fn stale_sibling_consumer_rebuilds_after_shared_input_changes() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(vec![
    project.concat_rule("one", &["src/a.txt"], &["build/one.txt"]),
    project.concat_rule("two", &["src/a.txt"], &["build/two.txt"]),
  ]);
  runner.run(&target("build/one.txt")).unwrap();
  runner.run(&target("build/two.txt")).unwrap();
  project.take_executed();

  project.write("src/a.txt", "beta\n");
  assert!(runner.run(&target("build/one.txt")).unwrap());
  assert_eq!(project.take_executed(), ["one"]);

  assert!(runner.run(&target("build/two.txt")).unwrap());
  assert_eq!(project.take_executed(), ["two"]);
  assert_eq!(project.read("build/two.txt"), "beta\n");

  assert!(!runner.run(&target("build/two.txt")).unwrap());
}

#[test]
fn consumer_of_rerun_virtual_target_rebuilds_later() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(vec![
    project.concat_rule("copy", &["src/a.txt"], &["build/b.txt"]),
    project.concat_rule("group", &["build/b.txt"], &["@group"]),
    project.concat_rule("final", &["@group"], &["build/c.txt"]),
  ]);
  runner.run(&target("build/c.txt")).unwrap();
  project.take_executed();

  project.write("src/a.txt", "beta\n");
  assert!(runner.run(&target("@group")).unwrap());
  assert_eq!(project.take_executed(), ["copy", "group"]);

  let report = runner.run_with_report(&target("build/c.txt")).unwrap();
  assert!(report.changed);
  assert_eq!(project.take_executed(), ["final"]);

  assert!(!runner.run(&target("build/c.txt")).unwrap());
}

#[test]
fn actions_receive_config_and_declared_order() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  project.write("src/b.txt", "beta\n");

  let rule = ResolvedRule::new(
    "inspect",
    ["src/b.txt", "src/a.txt"],
    ["@report", "@summary"],
    action_fn(|outputs, inputs, config| {
      let ids: Vec<_> = outputs.iter().chain(inputs).map(|t| t.id.to_string()).collect();
      if ids != ["@report", "@summary", "src/b.txt", "src/a.txt"] {
        return Err(format!("unexpected order {:?}", ids).into());
      }
      match config.get("level") {
        Some(ConstValue::Int(3)) => Ok(()),
        other => Err(format!("unexpected level {:?}", other).into()),
      }
    }),
  );
  let config = Config::from([("level".to_string(), ConstValue::Int(3))]);
  let runner = project.runner_with_config(vec![rule], config);

  assert!(runner.run(&target("@summary")).unwrap());
}

#[test]
fn duplicate_outputs_are_rejected() {
  let project = Project::new();
  let err = Runner::new(
    vec![
      project.concat_rule("first", &[], &["build/out"]),
      project.concat_rule("second", &[], &["build/out"]),
    ],
    Config::new(),
    project.handlers(),
    project.db_path(),
  )
  .unwrap_err();

  assert_eq!(err.kind(), ErrorKind::Configuration);
  assert_eq!(
    err.to_string(),
    "target `build/out` is produced by both `first` and `second`"
  );
}

#[test]
fn duplicate_rule_ids_are_rejected() {
  let project = Project::new();
  let err = Runner::new(
    vec![
      project.concat_rule("gen", &[], &["build/x"]),
      project.concat_rule("gen", &[], &["build/y"]),
    ],
    Config::new(),
    project.handlers(),
    project.db_path(),
  )
  .unwrap_err();

  assert!(matches!(err, RunnerError::DuplicateRule(id) if id.as_str() == "gen"));
}

#[test]
fn targets_are_listed_sorted() {
  let project = Project::new();
  let runner = project.runner(project.chain_rules());

  let listed: Vec<_> = runner
    .targets()
    .into_iter()
    .map(|(target, rule)| (target.to_string(), rule.to_string()))
    .collect();

  assert_eq!(
    listed,
    [
      ("build/b.txt".to_string(), "copy".to_string()),
      ("build/c.txt".to_string(), "final".to_string()),
    ]
  );
}
