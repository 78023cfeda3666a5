use std::path::PathBuf;

use serde::Deserialize;

use crate::rules::RetentionRules;

pub const ENV_EXAMPLE_FILENAME: &str = ".env.example";
pub const ENV_TARGET_FILENAME: &str = ".env.local";

/// Which workspace manifest lists the packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MonorepoType {
  /// `pnpm-workspace.yaml`
  Pnpm,
  /// `lerna.json`
  Lerna,
  /// Probe for pnpm first, then lerna
  #[default]
  Auto,
}

/// Fully resolved settings handed to the resolver and the reconciler.
///
/// `env_example_name` and `env_name` are relative to each package directory,
/// unless rooted, in which case they are relative to `workspace_root`.
#[derive(Debug, Clone)]
pub struct Settings {
  pub workspace_root: PathBuf,
  pub env_example_name: PathBuf,
  pub env_name: PathBuf,
  /// Explicit package patterns; when non-empty, manifest detection is skipped.
  pub packages: Vec<String>,
  pub monorepo_type: MonorepoType,
  pub skip_if_exists: RetentionRules,
  /// Keep target-only variables that the template does not mention.
  pub preserve_custom_vars: bool,
}

impl Settings {
  pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
    Self {
      workspace_root: workspace_root.into(),
      env_example_name: PathBuf::from(ENV_EXAMPLE_FILENAME),
      env_name: PathBuf::from(ENV_TARGET_FILENAME),
      packages: Vec::new(),
      monorepo_type: MonorepoType::default(),
      skip_if_exists: RetentionRules::default(),
      preserve_custom_vars: true,
    }
  }

  pub fn with_env_example_name(mut self, name: impl Into<PathBuf>) -> Self {
    self.env_example_name = name.into();
    self
  }

  pub fn with_env_name(mut self, name: impl Into<PathBuf>) -> Self {
    self.env_name = name.into();
    self
  }

  pub fn with_packages<I, S>(mut self, packages: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.packages = packages.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_monorepo_type(mut self, monorepo_type: MonorepoType) -> Self {
    self.monorepo_type = monorepo_type;
    self
  }

  pub fn with_skip_if_exists(mut self, rules: RetentionRules) -> Self {
    self.skip_if_exists = rules;
    self
  }

  pub fn with_preserve_custom_vars(mut self, preserve: bool) -> Self {
    self.preserve_custom_vars = preserve;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let settings = Settings::new("/workspace");

    assert_eq!(settings.env_example_name, PathBuf::from(".env.example"));
    assert_eq!(settings.env_name, PathBuf::from(".env.local"));
    assert_eq!(settings.monorepo_type, MonorepoType::Auto);
    assert!(settings.packages.is_empty());
    assert!(settings.skip_if_exists.is_empty());
    assert!(settings.preserve_custom_vars);
  }
}
