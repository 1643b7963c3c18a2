//! Filesystem layout for a stemcell build.
//!
//! Every location is a pure function of the mount root, the infrastructure
//! name, the hypervisor, the operating system name and the version. Builds
//! for different (infrastructure, hypervisor, os) triples get disjoint
//! directory trees; builds for the same triple share one and must not run
//! at the same time.

use anyhow::{bail, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::definition::Definition;

/// Default mount root that holds the `stemcells/` tree.
pub const DEFAULT_MOUNT_ROOT: &str = "/mnt";

/// Product name used in stemcell archive filenames.
pub const STEMCELL_PRODUCT_NAME: &str = "bosh-stemcell";

/// Reject values that would not stay a single path component.
///
/// Empty strings, `.`, `..`, and anything containing `/` or NUL would let
/// the joined path escape the mount root or collide with another target.
fn validate_component(what: &str, value: &str) -> Result<()> {
    if value.is_empty() || value == "." || value == ".." {
        bail!("Invalid {} '{}': must be a plain name", what, value);
    }
    if value.contains('/') || value.contains('\0') {
        bail!("Invalid {} '{}': must not contain '/' or NUL", what, value);
    }
    Ok(())
}

/// Name of the raw image file the pipeline writes into the work path.
pub fn stemcell_image_name(definition: &Definition) -> String {
    format!(
        "{}-{}-{}.raw",
        definition.infrastructure.name,
        definition.infrastructure.hypervisor,
        definition.operating_system.name
    )
}

/// Resolved paths for one build target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StemcellPaths {
    pub base_directory: PathBuf,
    pub build_root: PathBuf,
    pub work_root: PathBuf,
    pub build_path: PathBuf,
    pub work_path: PathBuf,
    pub chroot_dir: PathBuf,
    pub settings_path: PathBuf,
    pub stemcell_path: PathBuf,
    pub image_mount_point: PathBuf,
    pub image_file_path: PathBuf,
    pub grub_mount_point: PathBuf,
    pub stemcell_files: Vec<PathBuf>,
}

impl StemcellPaths {
    /// Resolve the layout, rejecting names that are not single path
    /// components.
    pub fn resolve(mount_root: &Path, definition: &Definition, version: &str) -> Result<Self> {
        let infra = &definition.infrastructure;
        let os = &definition.operating_system;
        validate_component("infrastructure name", &infra.name)?;
        validate_component("hypervisor", &infra.hypervisor)?;
        validate_component("operating system name", &os.name)?;
        validate_component("version", version)?;
        if !os.version.is_empty() {
            validate_component("operating system version", &os.version)?;
        }

        let base_directory = mount_root
            .join("stemcells")
            .join(&infra.name)
            .join(&infra.hypervisor)
            .join(&os.name);

        let build_root = base_directory.join("build");
        let work_root = base_directory.join("work");
        let build_path = build_root.join("build");
        let work_path = work_root.join("work");

        let image_name = stemcell_image_name(definition);
        let stemcell_files = definition
            .infrastructure
            .disk_formats
            .iter()
            .map(|format| {
                work_path.join(format!(
                    "{}-{}-{}.tgz",
                    STEMCELL_PRODUCT_NAME,
                    version,
                    definition.stemcell_name(*format)
                ))
            })
            .collect();

        Ok(Self {
            chroot_dir: work_path.join("chroot"),
            settings_path: build_path.join("etc").join("settings.bash"),
            stemcell_path: work_path.join("stemcell"),
            image_mount_point: work_path.join("mnt"),
            image_file_path: work_path.join(&image_name),
            grub_mount_point: work_path.join("mnt/tmp/grub").join(&image_name),
            stemcell_files,
            base_directory,
            build_root,
            work_root,
            build_path,
            work_path,
        })
    }

    /// Directory the finished stemcell archives land in.
    pub fn stemcell_tarball_path(&self) -> &Path {
        &self.work_path
    }

    /// Print the layout for `show paths`.
    pub fn print(&self) {
        println!("Stemcell paths:");
        println!("  base_directory: {}", self.base_directory.display());
        println!("  build_root:     {}", self.build_root.display());
        println!("  work_root:      {}", self.work_root.display());
        println!("  build_path:     {}", self.build_path.display());
        println!("  work_path:      {}", self.work_path.display());
        println!("  chroot_dir:     {}", self.chroot_dir.display());
        println!("  settings_path:  {}", self.settings_path.display());
        println!("  stemcell_path:  {}", self.stemcell_path.display());
        println!("  image_file:     {}", self.image_file_path.display());
        for file in &self.stemcell_files {
            println!("  stemcell_file:  {}", file.display());
        }
    }
}
