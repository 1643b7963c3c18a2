//! Configuration management for the stemcell builder.
//!
//! Reads configuration from a `.env` file and the process environment.
//! Environment variables take precedence over `.env`. Both are captured once
//! into an [`EnvSnapshot`] so nothing downstream reads ambient state.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::environment::{BuildMode, BuildOptions};
use crate::paths::DEFAULT_MOUNT_ROOT;
use crate::settings::EnvSnapshot;

/// Builder configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Stemcell builder sources copied into each build (default: stemcell_builder)
    pub builder_source: PathBuf,
    /// Verification suite root (default: bosh-stemcell)
    pub specs_dir: PathBuf,
    /// File whose content overrides BUILD_TIME (default: build_time.txt)
    pub build_time_marker: PathBuf,
    /// Root holding the stemcells/ tree (default: /mnt)
    pub mount_root: PathBuf,
    /// Run unmount/removal through sudo (default: true)
    pub use_sudo: bool,
    /// Root disk size override in MiB
    pub disk_size: Option<u32>,
    /// Set from `resume_from`; a resumed build keeps the existing tree
    pub resume_from: Option<String>,
}

/// Capture `.env` from `base_dir` overlaid with the process environment.
pub fn environment_snapshot(base_dir: &Path) -> EnvSnapshot {
    let mut vars = EnvSnapshot::new();

    let env_path = base_dir.join(".env");
    if env_path.exists() {
        match dotenvy::from_path_iter(&env_path) {
            Ok(iter) => {
                for item in iter {
                    match item {
                        Ok((key, value)) => {
                            vars.insert(key, value);
                        }
                        Err(e) => {
                            tracing::warn!(path = %env_path.display(), "skipping .env entry: {}", e)
                        }
                    }
                }
            }
            Err(e) => tracing::warn!(path = %env_path.display(), "ignoring .env: {}", e),
        }
    }

    for (key, value) in std::env::vars_os() {
        match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => {
                vars.insert(key, value);
            }
            (Ok(key), Err(_)) => tracing::warn!(key = %key, "skipping non-UTF-8 environment value"),
            (Err(key), _) => {
                tracing::warn!(key = %key.to_string_lossy(), "skipping non-UTF-8 environment variable")
            }
        }
    }
    vars
}

impl Config {
    /// Build configuration from an explicit variable snapshot.
    pub fn from_vars(base_dir: &Path, vars: &EnvSnapshot) -> Result<Self> {
        let path_or = |key: &str, default: &str| {
            vars.get(key)
                .map(|s| {
                    let path = PathBuf::from(s);
                    if path.is_absolute() {
                        path
                    } else {
                        base_dir.join(path)
                    }
                })
                .unwrap_or_else(|| base_dir.join(default))
        };

        let builder_source = path_or("STEMCELL_BUILDER_SOURCE", "stemcell_builder");
        let specs_dir = path_or("STEMCELL_SPECS_DIR", "bosh-stemcell");
        let build_time_marker = path_or("BUILD_TIME_MARKER_FILE", "build_time.txt");

        let mount_root = vars
            .get("STEMCELL_MOUNT_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MOUNT_ROOT));

        let use_sudo = match vars.get("STEMCELL_USE_SUDO") {
            Some(value) => parse_bool(value)
                .with_context(|| format!("Invalid STEMCELL_USE_SUDO '{}'", value))?,
            None => true,
        };

        let disk_size = vars
            .get("STEMCELL_DISK_SIZE")
            .map(|s| {
                s.parse::<u32>()
                    .with_context(|| format!("Invalid STEMCELL_DISK_SIZE '{}'", s))
            })
            .transpose()?;

        let resume_from = vars
            .get("resume_from")
            .filter(|s| !s.is_empty())
            .cloned();

        Ok(Self {
            builder_source,
            specs_dir,
            build_time_marker,
            mount_root,
            use_sudo,
            disk_size,
            resume_from,
        })
    }

    pub fn build_mode(&self) -> BuildMode {
        if self.resume_from.is_some() {
            BuildMode::Resumed
        } else {
            BuildMode::Fresh
        }
    }

    /// Options for a [`crate::environment::BuildEnvironment`], sweeping
    /// `artifacts_dir` for stray archives.
    pub fn build_options(&self, artifacts_dir: &Path) -> BuildOptions {
        BuildOptions {
            mount_root: self.mount_root.clone(),
            builder_source: self.builder_source.clone(),
            specs_dir: self.specs_dir.clone(),
            build_time_marker: self.build_time_marker.clone(),
            artifacts_dir: artifacts_dir.to_path_buf(),
            use_sudo: self.use_sudo,
            disk_size: self.disk_size,
        }
    }

    pub fn has_builder_source(&self) -> bool {
        self.builder_source.is_dir()
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  STEMCELL_BUILDER_SOURCE: {}", self.builder_source.display());
        println!("  STEMCELL_SPECS_DIR: {}", self.specs_dir.display());
        println!("  BUILD_TIME_MARKER_FILE: {}", self.build_time_marker.display());
        println!("  STEMCELL_MOUNT_ROOT: {}", self.mount_root.display());
        println!("  STEMCELL_USE_SUDO: {}", self.use_sudo);
        match self.disk_size {
            Some(size) => println!("  STEMCELL_DISK_SIZE: {}", size),
            None => println!("  STEMCELL_DISK_SIZE: (infrastructure default)"),
        }
        match &self.resume_from {
            Some(stage) => println!("  resume_from: {}", stage),
            None => println!("  resume_from: (fresh build)"),
        }
        if self.has_builder_source() {
            println!("  Builder source: FOUND");
        } else {
            println!("  Builder source: NOT FOUND");
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => bail!("expected true or false"),
    }
}
