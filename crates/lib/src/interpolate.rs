//! Property interpolation for manifest strings.
//!
//! Coordinates, artifact paths and step commands may reference properties
//! that are only known once a variant and target version are chosen.
//!
//! # Format
//!
//! - `${name}` - replaced with the value of property `name`
//! - `$${` - a literal `${`
//!
//! Single `$` characters pass through unchanged, so shell variables like
//! `$HOME` in step commands need no escaping.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use chisel_lib::interpolate::substitute;
//!
//! let props = BTreeMap::from([("minecraft".to_string(), "1.20.1".to_string())]);
//! let out = substitute("com.mojang:minecraft:${minecraft}", &props).unwrap();
//! assert_eq!(out, "com.mojang:minecraft:1.20.1");
//! ```

use std::collections::BTreeMap;

use thiserror::Error;

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Literal(String),
  Property(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpolateError {
  #[error("unclosed property reference at position {0}")]
  Unclosed(usize),

  #[error("empty property reference at position {0}")]
  Empty(usize),

  #[error("unknown property '{0}'")]
  UnknownProperty(String),
}

/// Source of property values.
pub trait PropertySource {
  fn property(&self, name: &str) -> Option<&str>;
}

impl PropertySource for BTreeMap<String, String> {
  fn property(&self, name: &str) -> Option<&str> {
    self.get(name).map(String::as_str)
  }
}

/// Parse a string into literal and property segments.
pub fn parse(input: &str) -> Result<Vec<Segment>, InterpolateError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    match chars.peek() {
      Some((_, '$')) => {
        chars.next();
        if let Some((_, '{')) = chars.peek() {
          // `$${` -> literal `${`
          chars.next();
          literal.push_str("${");
        } else {
          literal.push_str("$$");
        }
      }
      Some((_, '{')) => {
        chars.next();
        let mut name = String::new();
        let mut closed = false;
        for (_, c) in chars.by_ref() {
          if c == '}' {
            closed = true;
            break;
          }
          name.push(c);
        }

        if !closed {
          return Err(InterpolateError::Unclosed(pos));
        }
        let name = name.trim();
        if name.is_empty() {
          return Err(InterpolateError::Empty(pos));
        }

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Property(name.to_string()));
      }
      _ => literal.push('$'),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Replace every `${name}` in `input` with its value from `source`.
pub fn substitute<S: PropertySource + ?Sized>(input: &str, source: &S) -> Result<String, InterpolateError> {
  let mut out = String::with_capacity(input.len());

  for segment in parse(input)? {
    match segment {
      Segment::Literal(text) => out.push_str(&text),
      Segment::Property(name) => {
        let value = source
          .property(&name)
          .ok_or_else(|| InterpolateError::UnknownProperty(name.clone()))?;
        out.push_str(value);
      }
    }
  }

  Ok(out)
}
