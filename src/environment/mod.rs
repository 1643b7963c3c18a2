//! Build environment preparation.
//!
//! [`BuildEnvironment`] resolves the layout for one build target and stages
//! it on disk for the shell pipeline:
//!
//! 1. sanitize leftovers of a previous build (fresh builds only)
//! 2. recreate the build path (fresh builds only)
//! 3. copy the stemcell builder sources into the build path
//! 4. create the work root
//! 5. create the stemcell output directory
//! 6. append the settings to `settings.bash`
//!
//! Steps run strictly in order. Apart from the unmounts in step 1, any
//! failure aborts the whole preparation.

mod copy;
mod sanitize;

pub use copy::copy_tree_contents;
pub use sanitize::{remove_stray_archives, remove_tree, unmount_quietly};

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::definition::Definition;
use crate::paths::{StemcellPaths, DEFAULT_MOUNT_ROOT};
use crate::settings::{self, hash_as_bash_env, EnvSnapshot, Settings, BUILD_TIME_KEY};
use crate::timing::Timer;
use crate::verify;

/// Whether a preparation starts from scratch or re-enters an existing tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Wipe previous state before staging.
    #[default]
    Fresh,
    /// Keep the existing tree; only copy and create-if-absent.
    Resumed,
}

/// Explicit inputs that would otherwise come from ambient process state.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Root holding the `stemcells/` tree.
    pub mount_root: PathBuf,
    /// Builder sources copied into the build path.
    pub builder_source: PathBuf,
    /// Root of the verification suite.
    pub specs_dir: PathBuf,
    pub build_time_marker: PathBuf,
    /// Directory swept for stray `*.tgz` archives.
    pub artifacts_dir: PathBuf,
    pub use_sudo: bool,
    /// Root disk size override in MiB.
    pub disk_size: Option<u32>,
}

impl BuildOptions {
    /// Options rooted at `base_dir`, with the default `/mnt` mount root.
    pub fn with_base_dir(base_dir: &Path) -> Self {
        Self {
            mount_root: PathBuf::from(DEFAULT_MOUNT_ROOT),
            builder_source: base_dir.join("stemcell_builder"),
            specs_dir: base_dir.join("bosh-stemcell"),
            build_time_marker: base_dir.join("build_time.txt"),
            artifacts_dir: PathBuf::from("."),
            use_sudo: true,
            disk_size: None,
        }
    }
}

/// Coordinator for one build invocation.
pub struct BuildEnvironment {
    env: EnvSnapshot,
    definition: Definition,
    version: String,
    os_image_tarball: PathBuf,
    options: BuildOptions,
    paths: StemcellPaths,
}

impl BuildEnvironment {
    pub fn new(
        env: EnvSnapshot,
        definition: Definition,
        version: &str,
        os_image_tarball: &Path,
        options: BuildOptions,
    ) -> Result<Self> {
        let paths = StemcellPaths::resolve(&options.mount_root, &definition, version)?;
        Ok(Self {
            env,
            definition,
            version: version.to_string(),
            os_image_tarball: os_image_tarball.to_path_buf(),
            options,
            paths,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn paths(&self) -> &StemcellPaths {
        &self.paths
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn stemcell_disk_size(&self) -> u32 {
        self.options
            .disk_size
            .unwrap_or(self.definition.infrastructure.default_disk_size)
    }

    fn build_time(&self) -> Result<Option<String>> {
        settings::build_time(&self.options.build_time_marker, &self.env)
    }

    /// Settings persisted for the shell pipeline.
    pub fn settings(&self) -> Result<Settings> {
        let build_time = self.build_time()?;
        Ok(Settings::for_target(
            &self.definition,
            &self.version,
            &self.os_image_tarball,
            self.options.disk_size,
            build_time.as_deref(),
        ))
    }

    /// `env` prefix forwarding proxy settings and the build time.
    pub fn command_env(&self) -> Result<String> {
        let mut pairs = settings::proxy_settings(&self.env);
        if let Some(build_time) = self.build_time()? {
            pairs.push((BUILD_TIME_KEY.to_string(), build_time));
        }
        Ok(format!(
            "env {}",
            hash_as_bash_env(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        ))
    }

    pub fn os_image_rspec_command(&self) -> String {
        verify::os_image_rspec_command(
            &self.options.specs_dir,
            &self.definition,
            &self.os_image_tarball,
        )
    }

    pub fn stemcell_rspec_command(&self) -> String {
        verify::stemcell_rspec_command(
            &self.options.specs_dir,
            &self.definition,
            &self.version,
            &self.paths,
        )
    }

    /// Stage the build tree. See the module docs for the step order.
    pub fn prepare_build(&self, mode: BuildMode) -> Result<()> {
        tracing::info!(
            base = %self.paths.base_directory.display(),
            ?mode,
            "preparing build environment"
        );

        if mode == BuildMode::Fresh {
            self.sanitize()?;
            self.prepare_build_path()?;
        } else {
            tracing::info!("resuming, keeping existing build tree");
        }
        self.copy_stemcell_builder_to_build_path()?;
        self.prepare_work_root()?;
        self.prepare_stemcell_path()?;
        self.persist_settings_for_bash()?;
        Ok(())
    }

    fn sanitize(&self) -> Result<()> {
        let timer = Timer::start("sanitize");

        let removed = remove_stray_archives(&self.options.artifacts_dir)?;
        if removed > 0 {
            tracing::info!(count = removed, "removed stray archives");
        }

        unmount_quietly(&self.paths.grub_mount_point, self.options.use_sudo);
        unmount_quietly(&self.paths.image_mount_point, self.options.use_sudo);

        tracing::info!(path = %self.paths.base_directory.display(), "removing base directory");
        remove_tree(&self.paths.base_directory, self.options.use_sudo)?;

        timer.finish();
        Ok(())
    }

    fn prepare_build_path(&self) -> Result<()> {
        let build_path = &self.paths.build_path;
        if build_path.exists() {
            tracing::info!(path = %build_path.display(), "removing build path");
            fs::remove_dir_all(build_path)
                .with_context(|| format!("Failed to remove {}", build_path.display()))?;
        }
        fs::create_dir_all(build_path)
            .with_context(|| format!("Failed to create {}", build_path.display()))?;
        Ok(())
    }

    fn copy_stemcell_builder_to_build_path(&self) -> Result<()> {
        let timer = Timer::start("copy stemcell builder");
        let copied = copy_tree_contents(&self.options.builder_source, &self.paths.build_path)?;
        tracing::info!(
            entries = copied,
            from = %self.options.builder_source.display(),
            to = %self.paths.build_path.display(),
            "copied stemcell builder"
        );
        timer.finish();
        Ok(())
    }

    fn prepare_work_root(&self) -> Result<()> {
        fs::create_dir_all(&self.paths.work_root)
            .with_context(|| format!("Failed to create {}", self.paths.work_root.display()))
    }

    fn prepare_stemcell_path(&self) -> Result<()> {
        fs::create_dir_all(&self.paths.stemcell_path)
            .with_context(|| format!("Failed to create {}", self.paths.stemcell_path.display()))
    }

    fn persist_settings_for_bash(&self) -> Result<()> {
        let settings = self.settings()?;
        let settings_path = &self.paths.settings_path;
        if let Some(parent) = settings_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        settings.append_to(settings_path)?;
        tracing::info!(
            path = %settings_path.display(),
            count = settings.len(),
            "persisted settings"
        );
        Ok(())
    }
}
