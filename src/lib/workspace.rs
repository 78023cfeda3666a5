//! Monorepo package discovery.
//!
//! Package patterns come either from the explicit `packages` setting or from a
//! workspace manifest (`pnpm-workspace.yaml`, `lerna.json`). Each pattern is a
//! literal directory such as `packages/core` or a single-level glob such as
//! `packages/*`; recursive `**` globs are not supported.
//!
//! Manifest problems never abort a run: they are logged and the workspace is
//! treated as having no packages.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;

#[cfg(feature = "tracing")]
use tracing::{debug, trace, warn};

use crate::settings::{MonorepoType, Settings};

pub const PNPM_WORKSPACE_FILENAME: &str = "pnpm-workspace.yaml";
pub const LERNA_MANIFEST_FILENAME: &str = "lerna.json";

const WILDCARD: char = '*';
const SINGLE_CHAR: char = '?';
const PATH_SEPARATOR: char = '/';
const NEGATION_PREFIX: char = '!';

/// Outcome of probing the workspace root for a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonorepoKind {
  Pnpm,
  Lerna,
  None,
}

#[derive(Debug, Default, Deserialize)]
struct PackagesManifest {
  #[serde(default)]
  packages: Option<Vec<String>>,
}

pub fn detect_monorepo_type(workspace_root: &Path) -> MonorepoKind {
  if workspace_root.join(PNPM_WORKSPACE_FILENAME).exists() {
    MonorepoKind::Pnpm
  } else if workspace_root.join(LERNA_MANIFEST_FILENAME).exists() {
    MonorepoKind::Lerna
  } else {
    MonorepoKind::None
  }
}

/// Reads the `packages` sequence of `pnpm-workspace.yaml`.
pub fn try_read_pnpm_workspace(workspace_root: &Path) -> Result<Vec<String>, ManifestError> {
  let path = workspace_root.join(PNPM_WORKSPACE_FILENAME);
  read_manifest(&path, |content| {
    serde_yaml::from_str::<Option<PackagesManifest>>(content)
      .map(Option::unwrap_or_default)
      .map_err(|source| ManifestError::Yaml {
        path: path.clone(),
        source,
      })
  })
}

/// Reads the `packages` array of `lerna.json` (JSON5 syntax accepted).
pub fn try_read_lerna_config(workspace_root: &Path) -> Result<Vec<String>, ManifestError> {
  let path = workspace_root.join(LERNA_MANIFEST_FILENAME);
  read_manifest(&path, |content| {
    json5::from_str::<PackagesManifest>(content).map_err(|source| ManifestError::Json5 {
      path: path.clone(),
      source,
    })
  })
}

pub fn read_pnpm_workspace(workspace_root: &Path) -> Vec<String> {
  try_read_pnpm_workspace(workspace_root).unwrap_or_else(log_manifest_error)
}

pub fn read_lerna_config(workspace_root: &Path) -> Vec<String> {
  try_read_lerna_config(workspace_root).unwrap_or_else(log_manifest_error)
}

fn read_manifest<F>(path: &Path, parse: F) -> Result<Vec<String>, ManifestError>
where
  F: FnOnce(&str) -> Result<PackagesManifest, ManifestError>,
{
  if !path.exists() {
    return Ok(Vec::new());
  }

  let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
    path: path.to_path_buf(),
    source,
  })?;

  if content.trim().is_empty() {
    return Ok(Vec::new());
  }

  let manifest = parse(&content)?;

  #[cfg(feature = "tracing")]
  debug!(?path, packages = ?manifest.packages, "Read workspace manifest");

  Ok(manifest.packages.unwrap_or_default())
}

fn log_manifest_error(_err: ManifestError) -> Vec<String> {
  #[cfg(feature = "tracing")]
  warn!("{}", _err);

  Vec::new()
}

/// Returns the package patterns for this workspace, explicit ones first.
pub fn package_patterns(workspace_root: &Path, settings: &Settings) -> Vec<String> {
  if !settings.packages.is_empty() {
    return settings.packages.clone();
  }

  let kind = match settings.monorepo_type {
    MonorepoType::Pnpm => MonorepoKind::Pnpm,
    MonorepoType::Lerna => MonorepoKind::Lerna,
    MonorepoType::Auto => detect_monorepo_type(workspace_root),
  };

  #[cfg(feature = "tracing")]
  debug!(?kind, "Resolved monorepo type");

  match kind {
    MonorepoKind::Pnpm => read_pnpm_workspace(workspace_root),
    MonorepoKind::Lerna => read_lerna_config(workspace_root),
    MonorepoKind::None => Vec::new(),
  }
}

/// Expands `patterns` into existing directories under `workspace_root`.
///
/// Results keep pattern order, then file-name order within a glob. A
/// directory matched by several patterns is returned once per pattern.
pub fn package_dirs<S: AsRef<str>>(patterns: &[S], workspace_root: &Path) -> Vec<PathBuf> {
  let mut dirs = Vec::new();

  for pattern in patterns {
    let pattern = pattern.as_ref().trim();
    let pattern = pattern.strip_prefix("./").unwrap_or(pattern);

    if pattern.is_empty() || pattern.starts_with(NEGATION_PREFIX) {
      #[cfg(feature = "tracing")]
      debug!(pattern, "Skipping package pattern");
      continue;
    }

    if pattern.contains(WILDCARD) {
      dirs.extend(resolve_glob_pattern(pattern, workspace_root));
    } else {
      let dir = workspace_root.join(pattern);
      if dir.is_dir() {
        dirs.push(dir);
      } else {
        #[cfg(feature = "tracing")]
        trace!(?dir, "Package directory does not exist");
      }
    }
  }

  dirs
}

/// Package directories for `settings`, or an empty list when the caller
/// should operate on the workspace root instead.
pub fn resolve_package_directories(workspace_root: &Path, settings: &Settings) -> Vec<PathBuf> {
  package_dirs(&package_patterns(workspace_root, settings), workspace_root)
}

/// Anchored regex for a single-level glob: `*` stays within one path
/// segment, `?` is exactly one character, everything else is literal.
pub fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
  let mut expr = String::from("^");
  let mut buf = [0; 4];

  for c in pattern.chars() {
    match c {
      WILDCARD => expr.push_str("[^/]*"),
      SINGLE_CHAR => expr.push('.'),
      c => expr.push_str(&regex::escape(c.encode_utf8(&mut buf))),
    }
  }

  expr.push('$');
  Regex::new(&expr)
}

fn resolve_glob_pattern(pattern: &str, workspace_root: &Path) -> Vec<PathBuf> {
  let base_segments: Vec<&str> = pattern
    .split(PATH_SEPARATOR)
    .filter(|segment| !segment.is_empty() && !segment.contains(WILDCARD))
    .collect();
  let base_dir = base_segments
    .iter()
    .fold(workspace_root.to_path_buf(), |dir, segment| dir.join(segment));

  if !base_dir.is_dir() {
    #[cfg(feature = "tracing")]
    trace!(?base_dir, pattern, "Glob base does not exist");
    return Vec::new();
  }

  let regex = match glob_to_regex(pattern) {
    Ok(regex) => regex,
    Err(_err) => {
      #[cfg(feature = "tracing")]
      warn!(pattern, "Invalid package pattern: {}", _err);
      return Vec::new();
    }
  };

  list_folders(&base_dir)
    .into_iter()
    .filter(|name| {
      let candidate = base_segments
        .iter()
        .copied()
        .chain(std::iter::once(name.as_str()))
        .collect::<Vec<_>>()
        .join("/");
      regex.is_match(&candidate)
    })
    .map(|name| base_dir.join(name))
    .collect()
}

/// Immediate subdirectory names of `dir`, sorted.
fn list_folders(dir: &Path) -> Vec<String> {
  let entries = match std::fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(_err) => {
      #[cfg(feature = "tracing")]
      warn!(?dir, "Failed to list directory: {}", _err);
      return Vec::new();
    }
  };

  let mut folders: Vec<String> = entries
    .filter_map(Result::ok)
    .filter(|entry| entry.file_type().is_ok_and(|ty| ty.is_dir()))
    .filter_map(|entry| entry.file_name().into_string().ok())
    .collect();
  folders.sort();
  folders
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
  #[error("Failed to read {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to parse {}: {source}", path.display())]
  Yaml {
    path: PathBuf,
    #[source]
    source: serde_yaml::Error,
  },
  #[error("Failed to parse {}: {source}", path.display())]
  Json5 {
    path: PathBuf,
    #[source]
    source: json5::Error,
  },
}
