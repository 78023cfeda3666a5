use clap::Parser;
use copy_env::config::{self, OneOrMany, RawSettings};
use copy_env::{CopyEnvManager, MonorepoType};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
  name = "copy-env",
  about = "Copy .env.example to .env in single projects and monorepo packages",
  version,
  author
)]
struct Cli {
  /// Config file path, absolute or relative to the workspace root
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Workspace root directory [default: current directory]
  #[arg(short, long)]
  root: Option<PathBuf>,

  /// Template file name or path
  #[arg(long)]
  env_example_name: Option<String>,

  /// Target file name or path
  #[arg(long)]
  env_name: Option<String>,

  /// Monorepo type
  #[arg(long = "type", value_enum)]
  monorepo_type: Option<MonorepoType>,

  /// Package patterns, replacing workspace manifest detection
  #[arg(long, num_args = 1.., value_name = "PATTERN")]
  packages: Vec<String>,

  /// Keep existing values of matching variables (name or /regex/)
  #[arg(long, num_args = 1.., value_name = "RULE")]
  skip_if_exists: Vec<String>,

  /// Drop variables that only exist in the target file
  #[arg(long)]
  no_preserve_custom_vars: bool,

  /// Verbose output (-v for verbose, -vv for very verbose)
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

impl Cli {
  fn overrides(&self) -> RawSettings {
    RawSettings {
      workspace_root: None,
      env_example_name: self.env_example_name.clone(),
      env_name: self.env_name.clone(),
      packages: (!self.packages.is_empty()).then(|| self.packages.clone()),
      monorepo_type: self.monorepo_type,
      skip_if_exists: (!self.skip_if_exists.is_empty())
        .then(|| OneOrMany::Many(self.skip_if_exists.clone())),
      preserve_custom_vars: self.no_preserve_custom_vars.then_some(false),
    }
  }
}

fn setup_tracing(verbose: u8) {
  use tracing_subscriber::fmt;
  use tracing_subscriber::prelude::*;

  let log_level = match verbose {
    0 => "warn",
    1 => "debug",
    _ => "trace",
  };

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
    ))
    .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
  let root = match &cli.root {
    Some(root) => root.clone(),
    None => std::env::current_dir()?,
  };

  let settings = config::read_config(&root, cli.config.as_deref())?
    .merge(cli.overrides())
    .normalize(&root)?;

  let report = CopyEnvManager::new(settings).execute()?;
  println!("{}", report);

  Ok(())
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  setup_tracing(cli.verbose);

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      eprintln!("Error: {}", err);
      ExitCode::FAILURE
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_no_flags_override_nothing() {
    let cli = Cli::parse_from(["copy-env"]);

    assert_eq!(cli.overrides(), RawSettings::default());
  }

  #[test]
  fn test_flags_map_to_overrides() {
    let cli = Cli::parse_from([
      "copy-env",
      "--skip-if-exists",
      "API_KEY",
      "/^SECRET_/",
      "--no-preserve-custom-vars",
      "--type",
      "lerna",
      "--packages",
      "apps/*",
      "--env-name",
      ".env",
    ]);
    let overrides = cli.overrides();

    assert_eq!(
      overrides.skip_if_exists,
      Some(OneOrMany::Many(vec!["API_KEY".into(), "/^SECRET_/".into()]))
    );
    assert_eq!(overrides.preserve_custom_vars, Some(false));
    assert_eq!(overrides.monorepo_type, Some(MonorepoType::Lerna));
    assert_eq!(overrides.packages, Some(vec!["apps/*".to_string()]));
    assert_eq!(overrides.env_name.as_deref(), Some(".env"));
    assert_eq!(overrides.env_example_name, None);
    assert_eq!(overrides.workspace_root, None);
  }
}
