//! Template-to-target reconciliation for a single package directory.
//!
//! # Merge Logic
//!
//! The merge:
//! 1. Takes the template as the base: its keys, its order, its values
//! 2. For each template key also present in the target:
//!    - If a retention rule matches the key, keep the target's value
//!    - Otherwise the template value wins, so template edits propagate
//! 3. If custom variables are preserved, target-only keys are appended in
//!    target order
//! 4. Writes the result over the target file, creating parent directories
//!
//! Running it twice without touching either file yields the same bytes.
//!
//! # Examples
//!
//! ```rust,no_run
//! use copy_env::reconcile::EnvReconciler;
//! use copy_env::settings::Settings;
//! use std::path::Path;
//!
//! let settings = Settings::new("/repo").with_env_name(".env");
//! EnvReconciler::reconcile_env(Path::new("/repo/packages/api"), &settings).unwrap();
//! ```

use std::path::{Component, Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::{debug, info, trace};

use crate::parse::EnvMap;
use crate::rules::RetentionRules;
use crate::settings::Settings;

/// Reconciles env files for one package directory at a time.
pub struct EnvReconciler;

impl EnvReconciler {
  /// Reconciles the template and target of `package_dir`.
  ///
  /// Returns [`ReconcileOutcome::Skipped`] without touching anything when the
  /// template does not exist. A missing target is treated as empty.
  pub fn reconcile_env(
    package_dir: &Path,
    settings: &Settings,
  ) -> Result<ReconcileOutcome, ReconcileError> {
    let template_path = Self::resolve_env_path(
      &settings.env_example_name,
      package_dir,
      &settings.workspace_root,
    );
    let target_path =
      Self::resolve_env_path(&settings.env_name, package_dir, &settings.workspace_root);

    #[cfg(feature = "tracing")]
    debug!(?package_dir, ?template_path, ?target_path, "Resolved env file paths");

    let Some(template_str) =
      read_optional(&template_path).map_err(|source| ReconcileError::ReadTemplate {
        path: template_path.clone(),
        source,
      })?
    else {
      #[cfg(feature = "tracing")]
      debug!(?template_path, "No template, skipping");
      return Ok(ReconcileOutcome::Skipped {
        template: template_path,
      });
    };

    let target_str = read_optional(&target_path)
      .map_err(|source| ReconcileError::ReadTarget {
        path: target_path.clone(),
        source,
      })?
      .unwrap_or_default();

    let template = EnvMap::from(template_str.as_str());
    let target = EnvMap::from(target_str.as_str());

    let merged = Self::merge(
      template,
      &target,
      &settings.skip_if_exists,
      settings.preserve_custom_vars,
    );
    let count = merged.len();

    Self::write_target(&merged, &target_path)?;

    #[cfg(feature = "tracing")]
    info!(?package_dir, count, "Copied envs");

    Ok(ReconcileOutcome::Written {
      target: target_path,
      count,
    })
  }

  /// Computes the merged map. The template decides which keys exist and
  /// their defaults; `rules` name the keys whose existing target value is
  /// kept.
  pub fn merge<'a>(
    mut template: EnvMap<'a>,
    target: &EnvMap<'a>,
    rules: &RetentionRules,
    preserve_custom_vars: bool,
  ) -> EnvMap<'a> {
    #[cfg(feature = "tracing")]
    debug!(
      "Merging {} template variables with {} existing",
      template.len(),
      target.len()
    );

    let template_len = template.len();

    for var in &mut template.variables {
      if let Some(existing) = target.get(&var.key)
        && rules.matches(&var.key)
      {
        #[cfg(feature = "tracing")]
        trace!("Retaining existing value for {}", var.key);

        var.value = existing.value.clone();
      }
    }

    if preserve_custom_vars {
      for var in &target.variables {
        if template.variables[..template_len]
          .iter()
          .all(|templated| templated.key != var.key)
        {
          #[cfg(feature = "tracing")]
          trace!("Preserving custom variable {}", var.key);

          template.variables.push(var.clone());
        }
      }
    }

    template
  }

  /// Rooted names are taken relative to the workspace root, others relative
  /// to the package directory.
  pub fn resolve_env_path(name: &Path, package_dir: &Path, workspace_root: &Path) -> PathBuf {
    if name.has_root() {
      let relative: PathBuf = name
        .components()
        .filter(|c| !matches!(c, Component::Prefix(_) | Component::RootDir))
        .collect();
      workspace_root.join(relative)
    } else {
      package_dir.join(name)
    }
  }

  fn write_target(merged: &EnvMap, target_path: &Path) -> Result<(), ReconcileError> {
    if let Some(parent) = target_path.parent()
      && !parent.as_os_str().is_empty()
      && !parent.exists()
    {
      #[cfg(feature = "tracing")]
      debug!(?parent, "Creating target directory");

      std::fs::create_dir_all(parent).map_err(|source| ReconcileError::CreateDir {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    #[cfg(feature = "tracing")]
    trace!(?target_path, "Writing merged env file");

    std::fs::write(target_path, merged.to_string()).map_err(|source| ReconcileError::Write {
      path: target_path.to_path_buf(),
      source,
    })
  }
}

fn read_optional(path: &Path) -> std::io::Result<Option<String>> {
  match std::fs::read_to_string(path) {
    Ok(content) => Ok(Some(content)),
    Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
    Err(err) => Err(err),
  }
}

/// What happened to one package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
  /// No template at this path
  Skipped { template: PathBuf },
  /// Target written with `count` variables
  Written { target: PathBuf, count: usize },
}

/// Errors that abort reconciliation of a package directory.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
  #[error("Failed to read template {}: {source}", path.display())]
  ReadTemplate {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to read {}: {source}", path.display())]
  ReadTarget {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to create directory {}: {source}", path.display())]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to write {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}
