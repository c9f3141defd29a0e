//! Placeholders in rule commands.
//!
//! A command refers to the rule's cooked targets and to the configuration
//! through placeholders that are substituted right before it runs:
//!
//! - `$${in:N}` / `$${out:N}` - the N-th input / output
//! - `$${ins}` / `$${outs}` - all inputs / outputs, space separated
//! - `$${config:KEY}` - a configuration value
//!
//! A single `$` passes through untouched so shell variables such as `$HOME`
//! keep working. `$$$` followed by `{` produces a literal `$${`.
//!
//! ```
//! use isengard_lib::placeholder::{parse, Placeholder, Segment};
//!
//! let segments = parse("cc -c $${in:0} -o $$out").unwrap();
//! assert_eq!(segments, vec![
//!   Segment::Literal("cc -c ".to_string()),
//!   Segment::Placeholder(Placeholder::Input(0)),
//!   Segment::Literal(" -o $$out".to_string()),
//! ]);
//! ```

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
  Input(usize),
  Output(usize),
  AllInputs,
  AllOutputs,
  Config(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Literal(String),
  Placeholder(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder `{0}`")]
  Unknown(String),

  #[error("invalid index in placeholder `{0}`")]
  InvalidIndex(String),

  #[error("rule has no input at index {0}")]
  MissingInput(usize),

  #[error("rule has no output at index {0}")]
  MissingOutput(usize),

  #[error("config has no key `{0}`")]
  MissingConfig(String),
}

/// Source of placeholder values.
pub trait Resolver {
  fn resolve_input(&self, index: usize) -> Result<String, PlaceholderError>;

  fn resolve_output(&self, index: usize) -> Result<String, PlaceholderError>;

  fn resolve_all_inputs(&self) -> String;

  fn resolve_all_outputs(&self) -> String;

  fn resolve_config(&self, key: &str) -> Result<String, PlaceholderError>;
}

/// Split `input` into literal text and placeholders.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut rest = input;
  let mut offset = 0;

  while let Some(start) = rest.find("$$") {
    literal.push_str(&rest[..start]);
    let after = &rest[start + 2..];

    if let Some(escaped) = after.strip_prefix("${") {
      literal.push_str("$${");
      offset += start + 4;
      rest = escaped;
      continue;
    }

    let Some(body) = after.strip_prefix('{') else {
      literal.push_str("$$");
      offset += start + 2;
      rest = after;
      continue;
    };

    let close = body.find('}').ok_or(PlaceholderError::Unclosed(offset + start))?;

    if !literal.is_empty() {
      segments.push(Segment::Literal(std::mem::take(&mut literal)));
    }
    segments.push(Segment::Placeholder(parse_body(&body[..close])?));

    offset += start + 3 + close + 1;
    rest = &body[close + 1..];
  }

  literal.push_str(rest);
  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

fn parse_body(body: &str) -> Result<Placeholder, PlaceholderError> {
  match body {
    "ins" => return Ok(Placeholder::AllInputs),
    "outs" => return Ok(Placeholder::AllOutputs),
    _ => {}
  }

  let (kind, arg) = body
    .split_once(':')
    .ok_or_else(|| PlaceholderError::Unknown(body.to_string()))?;

  let index = || {
    arg
      .parse::<usize>()
      .map_err(|_| PlaceholderError::InvalidIndex(body.to_string()))
  };

  match kind {
    "in" => Ok(Placeholder::Input(index()?)),
    "out" => Ok(Placeholder::Output(index()?)),
    "config" if !arg.is_empty() => Ok(Placeholder::Config(arg.to_string())),
    _ => Err(PlaceholderError::Unknown(body.to_string())),
  }
}

/// Parse and substitute in one step.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, PlaceholderError> {
  let mut result = String::with_capacity(input.len());

  for segment in parse(input)? {
    match segment {
      Segment::Literal(text) => result.push_str(&text),
      Segment::Placeholder(Placeholder::Input(i)) => result.push_str(&resolver.resolve_input(i)?),
      Segment::Placeholder(Placeholder::Output(i)) => result.push_str(&resolver.resolve_output(i)?),
      Segment::Placeholder(Placeholder::AllInputs) => result.push_str(&resolver.resolve_all_inputs()),
      Segment::Placeholder(Placeholder::AllOutputs) => result.push_str(&resolver.resolve_all_outputs()),
      Segment::Placeholder(Placeholder::Config(key)) => result.push_str(&resolver.resolve_config(&key)?),
    }
  }

  Ok(result)
}
