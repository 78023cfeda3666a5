//! Line-oriented `KEY=VALUE` parsing into an insertion-ordered map.
//!
//! Every physical line is an independent entry. Blank lines, comment lines and
//! lines without an assignment are dropped; there are no multi-line values and
//! no quoting rules.

use std::{borrow::Cow, fmt};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

const COMMENT_PREFIX: &str = "#";
const ASSIGNMENT_OPERATOR: char = '=';
const LINE_SEPARATOR: char = '\n';

/// Ordered mapping from variable name to raw value.
///
/// Order is first-occurrence order. Setting a key that is already present
/// updates the value in place and keeps the original position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnvMap<'a> {
  pub variables: Vec<EnvVariable<'a>>,
}

impl<'a> fmt::Display for EnvMap<'a> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, var) in self.variables.iter().enumerate() {
      if i > 0 {
        write!(f, "{}", LINE_SEPARATOR)?;
      }
      write!(f, "{}", var)?;
    }
    Ok(())
  }
}

impl<'a> From<&'a str> for EnvMap<'a> {
  fn from(s: &'a str) -> Self {
    #[cfg(feature = "tracing")]
    debug!("Parsing env content with {} lines", s.split(LINE_SEPARATOR).count());

    let mut map = EnvMap::default();

    for line in s.split(LINE_SEPARATOR) {
      match EnvVariable::parse_line(line) {
        Some(var) => {
          #[cfg(feature = "tracing")]
          trace!("Found variable: {}", var.key);

          map.set(var.key, var.value);
        }
        None => {
          #[cfg(feature = "tracing")]
          trace!("Skipping line: {:?}", line);
        }
      }
    }

    #[cfg(feature = "tracing")]
    debug!("Parsed {} variables", map.len());

    map
  }
}

impl<'a, K, V> FromIterator<(K, V)> for EnvMap<'a>
where
  K: Into<Cow<'a, str>>,
  V: Into<Cow<'a, str>>,
{
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut map = EnvMap::default();
    for (key, value) in iter {
      map.set(key, value);
    }
    map
  }
}

impl<'a> EnvMap<'a> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<&EnvVariable<'a>> {
    self.variables.iter().find(|var| var.key == key)
  }

  pub fn value(&self, key: &str) -> Option<&str> {
    self.get(key).map(|var| var.value.as_ref())
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.get(key).is_some()
  }

  /// Inserts or updates `key`, returning the previous value if there was one.
  pub fn set(
    &mut self,
    key: impl Into<Cow<'a, str>>,
    value: impl Into<Cow<'a, str>>,
  ) -> Option<Cow<'a, str>> {
    let key = key.into();
    let value = value.into();

    if let Some(var) = self.variables.iter_mut().find(|var| var.key == key) {
      return Some(std::mem::replace(&mut var.value, value));
    }

    self.variables.push(EnvVariable { key, value });
    None
  }

  pub fn len(&self) -> usize {
    self.variables.len()
  }

  pub fn is_empty(&self) -> bool {
    self.variables.is_empty()
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.variables.iter().map(|var| var.key.as_ref())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvVariable<'a> {
  pub key: Cow<'a, str>,
  pub value: Cow<'a, str>,
}

impl<'a> fmt::Display for EnvVariable<'a> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}{}", self.key, ASSIGNMENT_OPERATOR, self.value)
  }
}

impl<'a> EnvVariable<'a> {
  /// Parses one physical line.
  ///
  /// The assignment is located on the untrimmed line; only the first `=` is
  /// significant, so values may contain further `=` characters.
  pub fn parse_line(line: &'a str) -> Option<Self> {
    let trimmed = line.trim();

    if trimmed.is_empty() || trimmed.starts_with(COMMENT_PREFIX) {
      return None;
    }

    let (key, value) = line.split_once(ASSIGNMENT_OPERATOR)?;
    let key = key.trim();

    if key.is_empty() {
      return None;
    }

    Some(EnvVariable {
      key: Cow::Borrowed(key),
      value: Cow::Borrowed(value.trim()),
    })
  }
}
