use isengard_lib::rule::RuleId;
use isengard_lib::runner::{ErrorKind, RunnerError};

use super::common::{Project, target};

#[test]
fn clean_removes_outputs_along_the_chain() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(project.chain_rules());
  runner.run(&target("build/c.txt")).unwrap();

  let report = runner.clean_with_report(&target("build/c.txt")).unwrap();

  assert_eq!(report.cleaned, [RuleId::from("final"), RuleId::from("copy")]);
  assert!(!project.exists("build/c.txt"));
  assert!(!project.exists("build/b.txt"));
  assert!(project.exists("src/a.txt"));
}

#[test]
fn leaves_are_never_cleaned() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(project.chain_rules());
  runner.run(&target("build/c.txt")).unwrap();

  runner.clean(&target("build/c.txt")).unwrap();

  assert_eq!(project.stats.cleaned(), ["build/c.txt", "build/b.txt"]);
}

#[test]
fn run_after_clean_rebuilds_everything() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(project.chain_rules());
  runner.run(&target("build/c.txt")).unwrap();
  runner.clean(&target("build/c.txt")).unwrap();
  project.take_executed();

  assert!(runner.run(&target("build/c.txt")).unwrap());
  assert_eq!(project.take_executed(), ["copy", "final"]);
  assert_eq!(project.read("build/c.txt"), "alpha\n");
}

#[test]
fn clean_without_prior_run_succeeds() {
  let project = Project::new();
  let runner = project.runner(project.chain_rules());

  runner.clean(&target("build/c.txt")).unwrap();
  assert!(!project.db_path().exists());
}

#[test]
fn shared_dependency_is_cleaned_once() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(vec![
    project.concat_rule("base", &["src/a.txt"], &["build/base.txt"]),
    project.concat_rule("left", &["build/base.txt"], &["build/left.txt"]),
    project.concat_rule("right", &["build/base.txt"], &["build/right.txt"]),
    project.concat_rule("top", &["build/left.txt", "build/right.txt"], &["build/top.txt"]),
  ]);
  runner.run(&target("build/top.txt")).unwrap();

  let report = runner.clean_with_report(&target("build/top.txt")).unwrap();

  assert_eq!(
    report.cleaned,
    [
      RuleId::from("top"),
      RuleId::from("left"),
      RuleId::from("base"),
      RuleId::from("right"),
    ]
  );
  let cleaned = project.stats.cleaned();
  assert_eq!(cleaned.iter().filter(|id| *id == "build/base.txt").count(), 1);
}

#[test]
fn clean_only_touches_the_requested_subgraph() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(vec![
    project.concat_rule("one", &["src/a.txt"], &["build/one.txt"]),
    project.concat_rule("two", &["src/a.txt"], &["build/two.txt"]),
  ]);
  runner.run(&target("build/one.txt")).unwrap();
  runner.run(&target("build/two.txt")).unwrap();
  project.take_executed();

  runner.clean(&target("build/one.txt")).unwrap();

  assert!(!project.exists("build/one.txt"));
  assert!(project.exists("build/two.txt"));
  assert!(!runner.run(&target("build/two.txt")).unwrap());
  assert!(project.take_executed().is_empty());
}

#[test]
fn clean_reports_cycles_with_full_chain() {
  let project = Project::new();
  let runner = project.runner(vec![
    project.concat_rule("a", &["build/b.txt"], &["build/a.txt"]),
    project.concat_rule("b", &["build/a.txt"], &["build/b.txt"]),
  ]);

  let err = runner.clean(&target("build/a.txt")).unwrap_err();

  assert_eq!(err.kind(), ErrorKind::Consistency);
  assert_eq!(err.to_string(), "recursion detected in rules a -> b -> a");
}

#[test]
fn clean_reports_self_dependency() {
  let project = Project::new();
  let runner = project.runner(vec![project.concat_rule("loop", &["build/x.txt"], &["build/x.txt"])]);

  let err = runner.clean(&target("build/x.txt")).unwrap_err();
  assert_eq!(err.to_string(), "recursion detected in rules loop -> loop");
}

#[test]
fn clean_of_target_without_producer_fails() {
  let project = Project::new();
  project.write("src/a.txt", "alpha\n");
  let runner = project.runner(project.chain_rules());

  let err = runner.clean(&target("src/a.txt")).unwrap_err();

  assert_eq!(err.kind(), ErrorKind::UnknownTarget);
  assert!(matches!(err, RunnerError::NoProducer { .. }));
  assert!(project.exists("src/a.txt"));
}
