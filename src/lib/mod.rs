//! Environment template synchronization for projects and monorepos.
//!
//! This library keeps `.env` files in step with their `.env.example`
//! templates. The template decides which variables exist and their default
//! values; retention rules keep operator-entered values (secrets, local
//! ports) and variables the template does not know about survive unless told
//! otherwise.
//!
//! In a monorepo every package is reconciled on its own. Packages come from an
//! explicit pattern list or from `pnpm-workspace.yaml` / `lerna.json`.
//!
//! # Features
//!
//! - **Template authority**: re-running after a template change propagates new
//!   and changed defaults everywhere
//! - **Retention rules**: exact names or `/regex/` patterns keep existing values
//! - **Workspace discovery**: pnpm and lerna manifests, single-level globs
//! - **Tracing**: detailed logging through the default `tracing` feature
//!
//! # Example
//!
//! ```rust,no_run
//! use copy_env::manager::CopyEnvManager;
//! use copy_env::rules::RetentionRules;
//! use copy_env::settings::Settings;
//!
//! let settings = Settings::new("/path/to/repo")
//!     .with_env_name(".env")
//!     .with_skip_if_exists(RetentionRules::parse_all(["API_KEY", "/^SECRET_/"]).unwrap());
//!
//! let report = CopyEnvManager::new(settings).execute().unwrap();
//! println!("{}", report);
//! ```

pub mod config;
pub mod manager;
pub mod parse;
pub mod reconcile;
pub mod rules;
pub mod settings;
pub mod workspace;

pub use manager::{CopyEnvError, CopyEnvManager, RunReport, copy_envs};
pub use settings::{MonorepoType, Settings};
