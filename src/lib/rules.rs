//! Retention rules deciding which existing target values survive a merge.
//!
//! A rule is written either as a bare variable name (`API_KEY`) or as a
//! slash-delimited regular expression with optional flags (`/^SECRET_/`,
//! `/token$/i`). Bare names match on equality and are also tried as an
//! unanchored regular expression, so `API_KEY` retains `API_KEY` and
//! `LEGACY_API_KEY` alike. Everything is compiled once, up front.

use std::{fmt, str::FromStr};

use regex::{Regex, RegexBuilder};

const PATTERN_DELIMITER: char = '/';

#[derive(Debug, Clone)]
pub enum RetentionRule {
  ExactName { name: String, regex: Regex },
  Pattern { regex: Regex, flags: String },
}

impl RetentionRule {
  pub fn exact(name: impl Into<String>) -> Result<Self, RuleError> {
    let name = name.into();
    let regex = Regex::new(&name).map_err(|source| RuleError::InvalidPattern {
      pattern: name.clone(),
      source,
    })?;
    Ok(RetentionRule::ExactName { name, regex })
  }

  /// Compiles `body` with the given single-letter flags (`i`, `m`, `s`, `x`).
  pub fn pattern(body: &str, flags: &str) -> Result<Self, RuleError> {
    let mut builder = RegexBuilder::new(body);

    for flag in flags.chars() {
      match flag {
        'i' => builder.case_insensitive(true),
        'm' => builder.multi_line(true),
        's' => builder.dot_matches_new_line(true),
        'x' => builder.ignore_whitespace(true),
        // JS-style flags with no meaning for a single key test
        'g' | 'u' | 'y' => &mut builder,
        _ => {
          return Err(RuleError::UnsupportedFlag {
            pattern: body.to_string(),
            flag,
          });
        }
      };
    }

    builder
      .build()
      .map(|regex| RetentionRule::Pattern {
        regex,
        flags: flags.to_string(),
      })
      .map_err(|source| RuleError::InvalidPattern {
        pattern: body.to_string(),
        source,
      })
  }

  pub fn matches(&self, key: &str) -> bool {
    match self {
      RetentionRule::ExactName { name, regex } => name == key || regex.is_match(key),
      RetentionRule::Pattern { regex, .. } => regex.is_match(key),
    }
  }
}

impl FromStr for RetentionRule {
  type Err = RuleError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let trimmed = s.trim();

    if let Some(rest) = trimmed.strip_prefix(PATTERN_DELIMITER)
      && let Some((body, flags)) = rest.rsplit_once(PATTERN_DELIMITER)
    {
      return RetentionRule::pattern(body, flags);
    }

    RetentionRule::exact(trimmed)
  }
}

impl fmt::Display for RetentionRule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RetentionRule::ExactName { name, .. } => write!(f, "{}", name),
      RetentionRule::Pattern { regex, flags } => write!(
        f,
        "{}{}{}{}",
        PATTERN_DELIMITER,
        regex.as_str(),
        PATTERN_DELIMITER,
        flags
      ),
    }
  }
}

/// A compiled set of rules evaluated with "any rule matches" semantics.
#[derive(Debug, Clone, Default)]
pub struct RetentionRules {
  rules: Vec<RetentionRule>,
}

impl RetentionRules {
  pub fn new(rules: Vec<RetentionRule>) -> Self {
    Self { rules }
  }

  pub fn parse_all<I, S>(sources: I) -> Result<Self, RuleError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    sources
      .into_iter()
      .map(|source| source.as_ref().parse())
      .collect::<Result<Vec<_>, _>>()
      .map(Self::new)
  }

  pub fn matches(&self, key: &str) -> bool {
    self.rules.iter().any(|rule| rule.matches(key))
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }
}

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
  #[error("Invalid retention pattern {pattern:?}: {source}")]
  InvalidPattern {
    pattern: String,
    #[source]
    source: regex::Error,
  },
  #[error("Unsupported flag '{flag}' on retention pattern {pattern:?}")]
  UnsupportedFlag { pattern: String, flag: char },
}
