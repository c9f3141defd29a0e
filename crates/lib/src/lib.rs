//! isengard-lib: incremental build engine
//!
//! This crate provides the pieces of an incremental build:
//! - `target`: target identifiers, their kinds and the handlers that
//!   fingerprint and clean them
//! - `rule`: resolved build steps and the actions they run
//! - `fingerprint`: the persistent fingerprint database
//! - `runner`: the evaluation engine bringing targets up to date
//! - `manifest`: loading rules files with shell command actions

pub mod action;
pub mod config;
pub mod consts;
pub mod fingerprint;
pub mod manifest;
pub mod placeholder;
pub mod rule;
pub mod runner;
pub mod target;
pub mod util;

pub use config::{Config, ConstValue};
pub use rule::{ResolvedRule, RuleAction, RuleId};
pub use runner::{CleanReport, ErrorKind, RunReport, Runner, RunnerError};
pub use target::{CookedTarget, CookedValue, Fingerprint, TargetHandler, TargetHandlers, TargetId};
