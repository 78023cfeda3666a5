//! Configuration file loading and normalization into [`Settings`].
//!
//! The config file lives in the workspace root and is looked up in this
//! order:
//!
//! ```text
//! .copy-env.json   (JSON5 syntax accepted)
//! .copy-env.json5
//! .copy-env.yaml
//! .copy-env.yml
//! .copy-env.toml
//! ```
//!
//! Keys use camelCase, e.g.
//!
//! ```json5
//! {
//!   envExampleName: ".env.example",
//!   envName: ".env",
//!   type: "pnpm",
//!   skipIfExists: ["API_KEY", "/^SECRET_/"],
//!   preserveCustomVars: true,
//! }
//! ```
//!
//! Command-line flags are layered on top with [`RawSettings::merge`] and the
//! result is turned into a [`Settings`] once, by [`RawSettings::normalize`].

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::rules::{RetentionRules, RuleError};
use crate::settings::{MonorepoType, Settings};

pub const CONFIG_FILENAMES: [&str; 5] = [
  ".copy-env.json",
  ".copy-env.json5",
  ".copy-env.yaml",
  ".copy-env.yml",
  ".copy-env.toml",
];

/// Settings as written by the user, every field optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSettings {
  pub workspace_root: Option<PathBuf>,
  pub env_example_name: Option<String>,
  pub env_name: Option<String>,
  pub packages: Option<Vec<String>>,
  #[serde(rename = "type")]
  pub monorepo_type: Option<MonorepoType>,
  pub skip_if_exists: Option<OneOrMany>,
  pub preserve_custom_vars: Option<bool>,
}

/// `skipIfExists` accepts a single rule or a list of rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
  One(String),
  Many(Vec<String>),
}

impl OneOrMany {
  pub fn into_vec(self) -> Vec<String> {
    match self {
      OneOrMany::One(rule) => vec![rule],
      OneOrMany::Many(rules) => rules,
    }
  }
}

impl RawSettings {
  /// Layers `overrides` on top of `self`; fields set in `overrides` win.
  pub fn merge(self, overrides: RawSettings) -> RawSettings {
    RawSettings {
      workspace_root: overrides.workspace_root.or(self.workspace_root),
      env_example_name: overrides.env_example_name.or(self.env_example_name),
      env_name: overrides.env_name.or(self.env_name),
      packages: overrides.packages.or(self.packages),
      monorepo_type: overrides.monorepo_type.or(self.monorepo_type),
      skip_if_exists: overrides.skip_if_exists.or(self.skip_if_exists),
      preserve_custom_vars: overrides.preserve_custom_vars.or(self.preserve_custom_vars),
    }
  }

  /// Applies defaults, makes the workspace root absolute and compiles the
  /// retention rules.
  ///
  /// A `workspaceRoot` in the file takes precedence over `workspace_root`;
  /// relative values are resolved against it.
  pub fn normalize(self, workspace_root: &Path) -> Result<Settings, ConfigError> {
    let root = match self.workspace_root {
      Some(configured) => workspace_root.join(configured),
      None => workspace_root.to_path_buf(),
    };
    let root = std::path::absolute(&root).map_err(|source| ConfigError::WorkspaceRoot {
      path: root.clone(),
      source,
    })?;

    let rules = RetentionRules::parse_all(
      self
        .skip_if_exists
        .map(OneOrMany::into_vec)
        .unwrap_or_default(),
    )?;

    let mut settings = Settings::new(root)
      .with_packages(self.packages.unwrap_or_default())
      .with_monorepo_type(self.monorepo_type.unwrap_or_default())
      .with_skip_if_exists(rules)
      .with_preserve_custom_vars(self.preserve_custom_vars.unwrap_or(true));

    if let Some(name) = self.env_example_name.filter(|name| !name.is_empty()) {
      settings = settings.with_env_example_name(name);
    }
    if let Some(name) = self.env_name.filter(|name| !name.is_empty()) {
      settings = settings.with_env_name(name);
    }

    Ok(settings)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
  Json5,
  Yaml,
  Toml,
}

impl ConfigFormat {
  /// Picks the format from the file extension; unknown extensions are JSON5.
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|ext| ext.to_str()) {
      Some("yaml" | "yml") => ConfigFormat::Yaml,
      Some("toml") => ConfigFormat::Toml,
      _ => ConfigFormat::Json5,
    }
  }

  /// Parses `content`; `path` is only used for error reporting.
  pub fn parse(self, path: &Path, content: &str) -> Result<RawSettings, ConfigError> {
    if content.trim().is_empty() {
      return Ok(RawSettings::default());
    }

    let path = path.to_path_buf();
    match self {
      ConfigFormat::Json5 => {
        json5::from_str(content).map_err(|source| ConfigError::Json5 { path, source })
      }
      ConfigFormat::Yaml => {
        serde_yaml::from_str(content).map_err(|source| ConfigError::Yaml { path, source })
      }
      ConfigFormat::Toml => {
        toml::from_str(content).map_err(|source| ConfigError::Toml { path, source })
      }
    }
  }
}

pub fn find_config_file(workspace_root: &Path) -> Option<PathBuf> {
  CONFIG_FILENAMES
    .iter()
    .map(|name| workspace_root.join(name))
    .find(|path| path.is_file())
}

/// Reads the config file for `workspace_root`.
///
/// `config_path` replaces discovery and may be absolute or relative to the
/// workspace root. A missing file yields empty settings.
pub fn read_config(
  workspace_root: &Path,
  config_path: Option<&Path>,
) -> Result<RawSettings, ConfigError> {
  let path = match config_path {
    Some(path) => workspace_root.join(path),
    None => match find_config_file(workspace_root) {
      Some(path) => path,
      None => {
        #[cfg(feature = "tracing")]
        debug!(?workspace_root, "No config file found, using defaults");
        return Ok(RawSettings::default());
      }
    },
  };

  if !path.exists() {
    #[cfg(feature = "tracing")]
    debug!(?path, "Config file does not exist, using defaults");
    return Ok(RawSettings::default());
  }

  #[cfg(feature = "tracing")]
  debug!(?path, "Reading config file");

  let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
    path: path.clone(),
    source,
  })?;

  ConfigFormat::from_path(&path).parse(&path, &content)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Failed to read config file {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to parse JSON5 config file {}: {source}", path.display())]
  Json5 {
    path: PathBuf,
    #[source]
    source: json5::Error,
  },
  #[error("Failed to parse YAML config file {}: {source}", path.display())]
  Yaml {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },
  #[error("Failed to parse TOML config file {}: {source}", path.display())]
  Toml {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
  #[error("Cannot resolve workspace root {}: {source}", path.display())]
  WorkspaceRoot {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error(transparent)]
  Rule(#[from] RuleError),
}
