//! Built-in rule actions.

mod cmd;

pub use cmd::{CmdAction, CmdError, execute_cmd};
