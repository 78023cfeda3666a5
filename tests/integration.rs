use copy_env::manager::{RootReason, RunMode};
use copy_env::reconcile::{EnvReconciler, ReconcileError, ReconcileOutcome};
use copy_env::rules::RetentionRules;
use copy_env::{CopyEnvError, CopyEnvManager, Settings, copy_envs};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, content).unwrap();
}

fn read(root: &Path, relative: &str) -> String {
  fs::read_to_string(root.join(relative)).unwrap()
}

#[test]
fn test_copy_without_existing_target() {
  let temp_dir = TempDir::new().unwrap();
  write(temp_dir.path(), ".env.example", "API_KEY=example\nPORT=3000\n");

  let settings = Settings::new(temp_dir.path()).with_env_name(".env");
  CopyEnvManager::new(settings).execute().unwrap();

  assert_eq!(read(temp_dir.path(), ".env"), "API_KEY=example\nPORT=3000");
}

#[test]
fn test_retained_value_survives() {
  let temp_dir = TempDir::new().unwrap();
  write(
    temp_dir.path(),
    ".env.example",
    "API_KEY=new-key\nSECRET_TOKEN=new-token\nPORT=3000",
  );
  write(temp_dir.path(), ".env", "API_KEY=prod-key");

  let settings = Settings::new(temp_dir.path())
    .with_env_name(".env")
    .with_skip_if_exists(RetentionRules::parse_all(["API_KEY"]).unwrap());
  CopyEnvManager::new(settings).execute().unwrap();

  assert_eq!(
    read(temp_dir.path(), ".env"),
    "API_KEY=prod-key\nSECRET_TOKEN=new-token\nPORT=3000"
  );
}

#[test]
fn test_unretained_value_is_overwritten() {
  let temp_dir = TempDir::new().unwrap();
  write(temp_dir.path(), ".env.example", "API_KEY=new-key\nDB_URL=localhost");
  write(temp_dir.path(), ".env", "API_KEY=prod-key\nDB_URL=prod-db");

  let settings = Settings::new(temp_dir.path())
    .with_env_name(".env")
    .with_skip_if_exists(RetentionRules::parse_all(["/^DB_/"]).unwrap());
  CopyEnvManager::new(settings).execute().unwrap();

  assert_eq!(
    read(temp_dir.path(), ".env"),
    "API_KEY=new-key\nDB_URL=prod-db"
  );
}

#[test]
fn test_custom_vars_preserved_by_default() {
  let temp_dir = TempDir::new().unwrap();
  write(temp_dir.path(), ".env.example", "PORT=3000");
  write(temp_dir.path(), ".env", "CUSTOM_ENV=custom-value");

  let settings = Settings::new(temp_dir.path()).with_env_name(".env");
  CopyEnvManager::new(settings).execute().unwrap();

  assert_eq!(
    read(temp_dir.path(), ".env"),
    "PORT=3000\nCUSTOM_ENV=custom-value"
  );
}

#[test]
fn test_custom_vars_dropped_when_disabled() {
  let temp_dir = TempDir::new().unwrap();
  write(temp_dir.path(), ".env.example", "PORT=3000");
  write(temp_dir.path(), ".env", "CUSTOM_ENV=custom-value");

  let settings = Settings::new(temp_dir.path())
    .with_env_name(".env")
    .with_preserve_custom_vars(false);
  CopyEnvManager::new(settings).execute().unwrap();

  assert_eq!(read(temp_dir.path(), ".env"), "PORT=3000");
}

#[test]
fn test_pnpm_workspace_packages_are_independent() {
  let temp_dir = TempDir::new().unwrap();
  write(
    temp_dir.path(),
    "pnpm-workspace.yaml",
    "packages:\n  - 'packages/*'\n",
  );
  write(temp_dir.path(), "packages/pkg1/.env.example", "PKG=one\nSHARED=1");
  write(temp_dir.path(), "packages/pkg2/.env.example", "PKG=two");

  let report = CopyEnvManager::new(Settings::new(temp_dir.path()))
    .execute()
    .unwrap();

  assert_eq!(report.mode, RunMode::Packages);
  assert_eq!(report.written(), 2);
  assert_eq!(
    read(temp_dir.path(), "packages/pkg1/.env.local"),
    "PKG=one\nSHARED=1"
  );
  assert_eq!(read(temp_dir.path(), "packages/pkg2/.env.local"), "PKG=two");
  assert!(!temp_dir.path().join(".env.local").exists());
}

#[test]
fn test_lerna_packages_without_template_are_skipped() {
  let temp_dir = TempDir::new().unwrap();
  write(
    temp_dir.path(),
    "lerna.json",
    "{\n  // JSON5 is fine here\n  packages: ['modules/*'],\n}",
  );
  write(temp_dir.path(), "modules/api/.env.example", "PORT=4000");
  fs::create_dir_all(temp_dir.path().join("modules/docs")).unwrap();

  let report = CopyEnvManager::new(Settings::new(temp_dir.path()))
    .execute()
    .unwrap();

  assert_eq!(report.packages.len(), 2);
  assert_eq!(report.written(), 1);
  assert!(matches!(
    report.packages[1].outcome,
    ReconcileOutcome::Skipped { .. }
  ));
  assert!(!temp_dir.path().join("modules/docs/.env.local").exists());
  assert!(report.to_string().ends_with("✓ Processed 2 package(s)"));
}

#[test]
fn test_unparsable_manifest_falls_back_to_root() {
  let temp_dir = TempDir::new().unwrap();
  write(temp_dir.path(), "pnpm-workspace.yaml", "packages: [oops");
  write(temp_dir.path(), ".env.example", "KEY=value");

  let report = CopyEnvManager::new(Settings::new(temp_dir.path()))
    .execute()
    .unwrap();

  assert_eq!(report.mode, RunMode::Root(RootReason::NoMonorepo));
  assert_eq!(read(temp_dir.path(), ".env.local"), "KEY=value");
}

#[test]
fn test_second_run_is_byte_identical() {
  let temp_dir = TempDir::new().unwrap();
  write(
    temp_dir.path(),
    ".env.example",
    "# comment\nAPI_KEY=example\n\nPORT=3000\nURL=http://x?a=b",
  );
  write(temp_dir.path(), ".env", "API_KEY=secret\nLOCAL_ONLY=1\n");

  let settings = Settings::new(temp_dir.path())
    .with_env_name(".env")
    .with_skip_if_exists(RetentionRules::parse_all(["API_KEY"]).unwrap());
  let manager = CopyEnvManager::new(settings);

  manager.execute().unwrap();
  let first = read(temp_dir.path(), ".env");
  manager.execute().unwrap();
  let second = read(temp_dir.path(), ".env");

  assert_eq!(first, "API_KEY=secret\nPORT=3000\nURL=http://x?a=b\nLOCAL_ONLY=1");
  assert_eq!(first, second);
}

#[test]
fn test_shared_template_from_workspace_root() {
  let temp_dir = TempDir::new().unwrap();
  write(temp_dir.path(), "env/.env.shared", "SHARED=yes");
  fs::create_dir_all(temp_dir.path().join("apps/web")).unwrap();
  fs::create_dir_all(temp_dir.path().join("apps/admin")).unwrap();

  let settings = Settings::new(temp_dir.path())
    .with_packages(["apps/*"])
    .with_env_example_name("/env/.env.shared")
    .with_env_name(".env");
  CopyEnvManager::new(settings).execute().unwrap();

  assert_eq!(read(temp_dir.path(), "apps/web/.env"), "SHARED=yes");
  assert_eq!(read(temp_dir.path(), "apps/admin/.env"), "SHARED=yes");
}

#[test]
fn test_relative_paths_resolve_from_package_directory() {
  let temp_dir = TempDir::new().unwrap();
  write(temp_dir.path(), "config/.env.example", "KEY=value");

  let settings = Settings::new(temp_dir.path())
    .with_env_example_name("config/.env.example")
    .with_env_name("config/.env");
  let outcome = EnvReconciler::reconcile_env(temp_dir.path(), &settings).unwrap();

  assert_eq!(
    outcome,
    ReconcileOutcome::Written {
      target: temp_dir.path().join("config/.env"),
      count: 1,
    }
  );
  assert_eq!(read(temp_dir.path(), "config/.env"), "KEY=value");
}

#[cfg(unix)]
#[test]
fn test_fatal_error_aborts_remaining_packages() {
  let temp_dir = TempDir::new().unwrap();
  write(temp_dir.path(), "packages/pkg1/.env.example", "A=1");
  write(temp_dir.path(), "packages/pkg2/.env.example", "B=2");
  // Target path occupied by a directory
  fs::create_dir_all(temp_dir.path().join("packages/pkg1/.env.local")).unwrap();

  let settings = Settings::new(temp_dir.path()).with_packages(["packages/*"]);
  let result = CopyEnvManager::new(settings).execute();

  match result {
    Err(CopyEnvError::Reconcile(ReconcileError::ReadTarget { path, .. })) => {
      assert_eq!(path, temp_dir.path().join("packages/pkg1/.env.local"))
    }
    other => panic!("Expected ReadTarget error, got {:?}", other),
  }
  assert!(!temp_dir.path().join("packages/pkg2/.env.local").exists());
}

#[test]
fn test_copy_envs_reads_config_file() {
  let temp_dir = TempDir::new().unwrap();
  write(
    temp_dir.path(),
    ".copy-env.json",
    "{
  envName: '.env',
  packages: ['services/*'],
  skipIfExists: ['/TOKEN$/i'],
  preserveCustomVars: false,
}",
  );
  write(
    temp_dir.path(),
    "services/auth/.env.example",
    "AUTH_TOKEN=changeme\nPORT=1",
  );
  write(
    temp_dir.path(),
    "services/auth/.env",
    "AUTH_TOKEN=real\nPORT=2\nDEBUG=1",
  );

  let report = copy_envs(temp_dir.path(), None).unwrap();

  assert_eq!(report.written(), 1);
  assert_eq!(
    read(temp_dir.path(), "services/auth/.env"),
    "AUTH_TOKEN=real\nPORT=1"
  );
}

#[test]
fn test_copy_envs_invalid_rule_fails_before_writing() {
  let temp_dir = TempDir::new().unwrap();
  write(
    temp_dir.path(),
    ".copy-env.json",
    "{ skipIfExists: '/(broken/' }",
  );
  write(temp_dir.path(), ".env.example", "KEY=value");

  let result = copy_envs(temp_dir.path(), None);

  assert!(matches!(result, Err(CopyEnvError::Config(_))));
  assert!(!temp_dir.path().join(".env.local").exists());
}
