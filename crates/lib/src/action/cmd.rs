//! Shell command actions.
//!
//! The command string goes through placeholder substitution against the
//! rule's cooked targets and the config, then runs through the platform shell
//! in the rules file's directory. The environment is inherited; on top of it
//! `ISENGARD_OUTPUTS` and `ISENGARD_INPUTS` hold the space separated cooked
//! targets.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::placeholder::{self, PlaceholderError, Resolver};
use crate::rule::{ActionError, RuleAction};
use crate::target::{CookedTarget, CookedValue};

#[derive(Debug, Error)]
pub enum CmdError {
  #[error("failed to spawn `{cmd}`: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: io::Error,
  },

  #[error("command failed with {}: {cmd}{}", exit_status(.code), stderr_suffix(.stderr))]
  Failed {
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("failed to create output directory {path}: {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

fn exit_status(code: &Option<i32>) -> String {
  match code {
    Some(code) => format!("exit code {}", code),
    None => "no exit code (terminated by signal)".to_string(),
  }
}

fn stderr_suffix(stderr: &str) -> String {
  if stderr.is_empty() {
    String::new()
  } else {
    format!("\n{}", stderr)
  }
}

/// A rule action running a shell command.
#[derive(Debug, Clone)]
pub struct CmdAction {
  pub cmd: String,
  pub env: BTreeMap<String, String>,
  pub cwd: PathBuf,
  /// Shell program replacing the platform default.
  pub shell: Option<String>,
}

impl CmdAction {
  pub fn new(cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
    Self {
      cmd: cmd.into(),
      env: BTreeMap::new(),
      cwd: cwd.into(),
      shell: None,
    }
  }
}

/// How a shell expects its command string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShellKind {
  Posix,
  Cmd,
  PowerShell,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Shell {
  program: String,
  args: Vec<String>,
  kind: ShellKind,
}

impl Shell {
  fn resolve(override_shell: Option<&str>) -> Self {
    let program = match override_shell {
      Some(shell) => shell.to_string(),
      #[cfg(unix)]
      None => "/bin/sh".to_string(),
      #[cfg(windows)]
      None => "cmd.exe".to_string(),
    };

    let name = Path::new(&program)
      .file_stem()
      .map(|s| s.to_string_lossy().to_ascii_lowercase())
      .unwrap_or_default();

    let (kind, args) = match name.as_str() {
      "powershell" | "pwsh" => (ShellKind::PowerShell, vec!["-NoProfile", "-Command"]),
      "cmd" => (ShellKind::Cmd, vec!["/C"]),
      _ => (ShellKind::Posix, vec!["-c"]),
    };

    Self {
      program,
      args: args.into_iter().map(String::from).collect(),
      kind,
    }
  }

  /// Quote `word` so the shell passes it through as a single argument.
  fn quote<'a>(&self, word: &'a str) -> Cow<'a, str> {
    let safe = !word.is_empty()
      && word
        .chars()
        .all(|c| {
          c.is_ascii_alphanumeric()
            || matches!(c, '/' | '.' | '_' | '-' | '+' | ':' | ',' | '@' | '=')
            || (c == '\\' && self.kind != ShellKind::Posix)
        });
    if safe {
      return Cow::Borrowed(word);
    }

    match self.kind {
      ShellKind::Posix => Cow::Owned(format!("'{}'", word.replace('\'', "'\\''"))),
      ShellKind::PowerShell => Cow::Owned(format!("'{}'", word.replace('\'', "''"))),
      ShellKind::Cmd => Cow::Owned(format!("\"{}\"", word)),
    }
  }
}

struct TargetResolver<'a> {
  outputs: &'a [CookedTarget],
  inputs: &'a [CookedTarget],
  config: &'a Config,
  shell: &'a Shell,
}

impl TargetResolver<'_> {
  fn render(&self, target: &CookedTarget) -> String {
    match target.value.path() {
      Some(path) => self.shell.quote(&path.to_string_lossy()).into_owned(),
      None => self.shell.quote(&target.value.to_string()).into_owned(),
    }
  }

  fn render_all(&self, targets: &[CookedTarget]) -> String {
    targets.iter().map(|t| self.render(t)).collect::<Vec<_>>().join(" ")
  }
}

/// Space separated cooked targets, unquoted, for environment variables.
fn join(targets: &[CookedTarget]) -> String {
  targets
    .iter()
    .map(|t| t.value.to_string())
    .collect::<Vec<_>>()
    .join(" ")
}

impl Resolver for TargetResolver<'_> {
  fn resolve_input(&self, index: usize) -> Result<String, PlaceholderError> {
    self
      .inputs
      .get(index)
      .map(|t| self.render(t))
      .ok_or(PlaceholderError::MissingInput(index))
  }

  fn resolve_output(&self, index: usize) -> Result<String, PlaceholderError> {
    self
      .outputs
      .get(index)
      .map(|t| self.render(t))
      .ok_or(PlaceholderError::MissingOutput(index))
  }

  fn resolve_all_inputs(&self) -> String {
    self.render_all(self.inputs)
  }

  fn resolve_all_outputs(&self) -> String {
    self.render_all(self.outputs)
  }

  // Config values are inserted verbatim so they can carry several words.
  fn resolve_config(&self, key: &str) -> Result<String, PlaceholderError> {
    self
      .config
      .get(key)
      .map(|v| v.to_string())
      .ok_or_else(|| PlaceholderError::MissingConfig(key.to_string()))
  }
}

impl RuleAction for CmdAction {
  fn run(&self, outputs: &[CookedTarget], inputs: &[CookedTarget], config: &Config) -> Result<(), ActionError> {
    let shell = Shell::resolve(self.shell.as_deref());
    let resolver = TargetResolver {
      outputs,
      inputs,
      config,
      shell: &shell,
    };
    let cmd = placeholder::substitute(&self.cmd, &resolver)?;

    create_output_dirs(outputs)?;

    let mut env = self.env.clone();
    env.insert("ISENGARD_OUTPUTS".to_string(), join(outputs));
    env.insert("ISENGARD_INPUTS".to_string(), join(inputs));

    run_in_shell(&shell, &cmd, &env, &self.cwd)?;
    Ok(())
  }
}

/// Make sure the directories receiving outputs exist before the command runs.
fn create_output_dirs(outputs: &[CookedTarget]) -> Result<(), CmdError> {
  for output in outputs {
    let dir = match &output.value {
      CookedValue::File(path) => path.parent(),
      CookedValue::Folder(path) => Some(path.as_path()),
      CookedValue::Virtual(_) => None,
    };
    if let Some(dir) = dir.filter(|d| !d.as_os_str().is_empty()) {
      fs::create_dir_all(dir).map_err(|source| CmdError::CreateDir {
        path: dir.to_path_buf(),
        source,
      })?;
    }
  }
  Ok(())
}

/// Run `cmd` through `shell` (the platform shell if `None`) in `cwd` and
/// return its trimmed stdout.
pub fn execute_cmd(
  cmd: &str,
  env: &BTreeMap<String, String>,
  cwd: &Path,
  shell: Option<&str>,
) -> Result<String, CmdError> {
  run_in_shell(&Shell::resolve(shell), cmd, env, cwd)
}

fn run_in_shell(shell: &Shell, cmd: &str, env: &BTreeMap<String, String>, cwd: &Path) -> Result<String, CmdError> {
  info!(cmd = %cmd, "executing command");
  debug!(shell = %shell.program, cwd = ?cwd, "spawning process");

  let output = Command::new(&shell.program)
    .args(&shell.args)
    .arg(cmd)
    .current_dir(cwd)
    .envs(env)
    .output()
    .map_err(|source| CmdError::Spawn {
      cmd: cmd.to_string(),
      source,
    })?;

  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
  let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

  if !stdout.is_empty() {
    debug!(stdout = %stdout, "command stdout");
  }
  if !stderr.is_empty() {
    debug!(stderr = %stderr, "command stderr");
  }

  if !output.status.success() {
    return Err(CmdError::Failed {
      cmd: cmd.to_string(),
      code: output.status.code(),
      stderr,
    });
  }

  Ok(stdout)
}
