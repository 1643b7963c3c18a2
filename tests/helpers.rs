//! Shared test utilities for stemcell-builder tests.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use stemcell_builder::{
    BuildEnvironment, BuildOptions, Definition, EnvSnapshot, Infrastructure, OperatingSystem,
};

/// Test environment with every external location inside one temp dir.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Stands in for /mnt
    pub mount_root: PathBuf,
    /// Mock stemcell_builder tree
    pub builder_source: PathBuf,
    /// Mock verification suite root
    pub specs_dir: PathBuf,
    /// Directory swept for stray archives
    pub artifacts_dir: PathBuf,
    pub build_time_marker: PathBuf,
    pub os_image_tarball: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base = temp_dir.path();

        let mount_root = base.join("mnt");
        let builder_source = base.join("stemcell_builder");
        let specs_dir = base.join("bosh-stemcell");
        let artifacts_dir = base.join("cwd");

        for dir in [&mount_root, &specs_dir, &artifacts_dir] {
            fs::create_dir_all(dir).expect("Failed to create test dir");
        }
        create_mock_builder(&builder_source);
        let build_time_marker = base.join("build_time.txt");
        let os_image_tarball = base.join("os-image.tgz");

        Self {
            _temp_dir: temp_dir,
            build_time_marker,
            os_image_tarball,
            mount_root,
            builder_source,
            specs_dir,
            artifacts_dir,
        }
    }

    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            mount_root: self.mount_root.clone(),
            builder_source: self.builder_source.clone(),
            specs_dir: self.specs_dir.clone(),
            build_time_marker: self.build_time_marker.clone(),
            artifacts_dir: self.artifacts_dir.clone(),
            use_sudo: false,
            disk_size: None,
        }
    }

    /// google/kvm/ubuntu jammy, version 777.
    pub fn environment(&self, env: EnvSnapshot) -> BuildEnvironment {
        self.environment_for(google_definition(), env)
    }

    pub fn environment_for(&self, definition: Definition, env: EnvSnapshot) -> BuildEnvironment {
        BuildEnvironment::new(
            env,
            definition,
            "777",
            &self.os_image_tarball,
            self.options(),
        )
        .expect("valid build target")
    }
}

pub fn google_definition() -> Definition {
    Definition::new(
        Infrastructure::for_name("google", Some("kvm")).expect("google is known"),
        OperatingSystem::new("ubuntu", "jammy"),
    )
}

pub fn snapshot(pairs: &[(&str, &str)]) -> EnvSnapshot {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Create a minimal stemcell_builder tree.
pub fn create_mock_builder(root: &Path) {
    for dir in ["etc", "lib", "stages/base_debootstrap"] {
        fs::create_dir_all(root.join(dir)).expect("Failed to create mock builder dir");
    }
    fs::write(root.join("etc/settings.bash"), "base_debootstrap_arch=amd64\n")
        .expect("Failed to create settings.bash");
    fs::write(root.join("lib/prelude_apply.bash"), "set -e\n")
        .expect("Failed to create prelude");

    let apply = root.join("stages/base_debootstrap/apply.sh");
    fs::write(&apply, "#!/usr/bin/env bash\n").expect("Failed to create apply.sh");
    fs::set_permissions(&apply, fs::Permissions::from_mode(0o755))
        .expect("Failed to set permissions");

    fs::write(root.join(".gitignore"), "*.tgz\n").expect("Failed to create .gitignore");
}

/// Sorted top-level entry names of `dir`.
pub fn entry_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("Failed to read dir")
        .map(|e| e.expect("bad entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Lines after the last settings separator.
pub fn last_settings_block(settings_file: &Path) -> Vec<String> {
    let content = fs::read_to_string(settings_file).expect("Failed to read settings file");
    let (_, block) = content
        .rsplit_once("# ====================\n")
        .expect("settings separator missing");
    block
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Assert that a file contains expected content.
pub fn assert_file_contains(path: &Path, expected: &str) {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|_| panic!("Failed to read file: {}", path.display()));
    assert!(
        content.contains(expected),
        "File {} does not contain expected content.\nExpected to find: {}\nActual content: {}",
        path.display(),
        expected,
        content
    );
}

/// Assert that a directory exists.
pub fn assert_dir_exists(path: &Path) {
    assert!(
        path.is_dir(),
        "Expected directory to exist: {}",
        path.display()
    );
}
