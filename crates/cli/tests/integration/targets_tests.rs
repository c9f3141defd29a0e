use predicates::prelude::*;

use super::common::{PROJECT_RULES, TestEnv};

#[test]
fn targets_lists_outputs_with_rules() {
  let env = TestEnv::with_rules(PROJECT_RULES);

  env
    .isg_cmd()
    .arg("targets")
    .assert()
    .success()
    .stdout(predicate::str::contains("build/app.o"))
    .stdout(predicate::str::contains("compile"))
    .stdout(predicate::str::contains("@all"));
}

#[test]
fn targets_json_is_sorted() {
  let env = TestEnv::with_rules(PROJECT_RULES);

  let output = env.isg_cmd().args(["targets", "-o", "json"]).output().unwrap();
  assert!(output.status.success());

  let items: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
  let targets: Vec<_> = items.iter().map(|i| i["target"].as_str().unwrap().to_string()).collect();
  assert_eq!(targets, ["@all", "build/app", "build/app.o", "build/broken"]);
  assert_eq!(items[0]["rule"], "all");
}

#[test]
fn empty_rules_file_has_no_targets() {
  let env = TestEnv::with_rules("{}");

  env
    .isg_cmd()
    .arg("targets")
    .assert()
    .success()
    .stdout(predicate::str::contains("No targets defined"));
}
