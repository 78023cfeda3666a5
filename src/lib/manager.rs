//! Run-level orchestration: resolve package directories, reconcile each one,
//! and report what happened.

use std::{
  fmt,
  path::{Path, PathBuf},
};

#[cfg(feature = "tracing")]
use tracing::info;

use crate::config::{self, ConfigError};
use crate::reconcile::{EnvReconciler, ReconcileError, ReconcileOutcome};
use crate::settings::Settings;
use crate::workspace;

/// Runs reconciliation for a workspace described by [`Settings`].
pub struct CopyEnvManager {
  settings: Settings,
}

impl CopyEnvManager {
  pub fn new(settings: Settings) -> Self {
    Self { settings }
  }

  /// Reconciles every package directory, or the workspace root when there
  /// are none.
  ///
  /// Directories are processed in order and the first fatal error stops the
  /// run.
  pub fn execute(&self) -> Result<RunReport, CopyEnvError> {
    let root = &self.settings.workspace_root;

    #[cfg(feature = "tracing")]
    info!(?root, "Starting copy-env");

    let patterns = workspace::package_patterns(root, &self.settings);
    if patterns.is_empty() {
      return self.execute_on_root(RootReason::NoMonorepo);
    }

    let package_dirs = workspace::package_dirs(&patterns, root);
    if package_dirs.is_empty() {
      return self.execute_on_root(RootReason::NoPackages);
    }

    let mut packages = Vec::with_capacity(package_dirs.len());
    for dir in package_dirs {
      let outcome = EnvReconciler::reconcile_env(&dir, &self.settings)?;
      packages.push(PackageReport { dir, outcome });
    }

    #[cfg(feature = "tracing")]
    info!("Processed {} package(s)", packages.len());

    Ok(RunReport {
      mode: RunMode::Packages,
      packages,
    })
  }

  fn execute_on_root(&self, reason: RootReason) -> Result<RunReport, CopyEnvError> {
    #[cfg(feature = "tracing")]
    info!("{}", reason);

    let dir = self.settings.workspace_root.clone();
    let outcome = EnvReconciler::reconcile_env(&dir, &self.settings)?;

    Ok(RunReport {
      mode: RunMode::Root(reason),
      packages: vec![PackageReport { dir, outcome }],
    })
  }
}

/// Loads configuration for `workspace_root` and runs a full pass.
///
/// `config_path` may be absolute or relative to `workspace_root`; without it
/// the usual config file names are probed.
pub fn copy_envs(
  workspace_root: &Path,
  config_path: Option<&Path>,
) -> Result<RunReport, CopyEnvError> {
  let settings = config::read_config(workspace_root, config_path)?.normalize(workspace_root)?;
  CopyEnvManager::new(settings).execute()
}

/// Why a run fell back to the workspace root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootReason {
  /// No explicit packages and no workspace manifest patterns
  NoMonorepo,
  /// Patterns exist but none resolved to a directory
  NoPackages,
}

impl fmt::Display for RootReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RootReason::NoMonorepo => {
        write!(f, "No monorepo detected, copying env in root directory...")
      }
      RootReason::NoPackages => write!(f, "No packages found, copying env in root directory..."),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
  Root(RootReason),
  Packages,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReport {
  pub dir: PathBuf,
  pub outcome: ReconcileOutcome,
}

/// Result of a complete run, printable as the CLI's progress output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
  pub mode: RunMode,
  pub packages: Vec<PackageReport>,
}

impl RunReport {
  /// Number of target files written.
  pub fn written(&self) -> usize {
    self
      .packages
      .iter()
      .filter(|pkg| matches!(pkg.outcome, ReconcileOutcome::Written { .. }))
      .count()
  }
}

impl fmt::Display for RunReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut lines = Vec::new();

    if let RunMode::Root(reason) = self.mode {
      lines.push(reason.to_string());
    }

    for pkg in &self.packages {
      if let ReconcileOutcome::Written { count, .. } = pkg.outcome {
        lines.push(format!(
          "✓ Successfully copied {} envs: {}",
          count,
          pkg.dir.display()
        ));
      }
    }

    if self.mode == RunMode::Packages {
      lines.push(String::new());
      lines.push(format!("✓ Processed {} package(s)", self.packages.len()));
    }

    write!(f, "{}", lines.join("\n"))
  }
}

#[derive(Debug, thiserror::Error)]
pub enum CopyEnvError {
  #[error(transparent)]
  Config(#[from] ConfigError),
  #[error(transparent)]
  Reconcile(#[from] ReconcileError),
}
