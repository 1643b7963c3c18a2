//! Integration tests for build environment preparation.
//!
//! Every test stages into a temp directory standing in for /mnt, with sudo
//! disabled.

mod helpers;

use helpers::{
    assert_dir_exists, assert_file_contains, entry_names, google_definition, last_settings_block,
    snapshot, TestEnv,
};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use stemcell_builder::{
    BuildEnvironment, BuildMode, Definition, EnvSnapshot, Infrastructure, OperatingSystem,
};

#[test]
fn test_fresh_prepare_creates_layout() {
    let t = TestEnv::new();
    let env = t.environment(EnvSnapshot::new());
    let paths = env.paths();

    env.prepare_build(BuildMode::Fresh).unwrap();

    assert_eq!(
        paths.base_directory,
        t.mount_root.join("stemcells/google/kvm/ubuntu")
    );
    assert_dir_exists(&paths.build_path);
    assert_dir_exists(&paths.work_root);
    assert_dir_exists(&paths.work_path.join("stemcell"));
    assert!(paths.settings_path.is_file());
}

#[test]
fn test_fresh_build_path_holds_only_builder_contents() {
    let t = TestEnv::new();
    let env = t.environment(EnvSnapshot::new());
    let paths = env.paths();

    // Leftovers from an earlier build
    fs::create_dir_all(&paths.build_path).unwrap();
    fs::write(paths.build_path.join("stale.txt"), "old").unwrap();
    fs::create_dir_all(&paths.chroot_dir).unwrap();
    fs::write(paths.chroot_dir.join("old-rootfs"), "old").unwrap();

    env.prepare_build(BuildMode::Fresh).unwrap();

    assert_eq!(entry_names(&paths.build_path), vec!["etc", "lib", "stages"]);
    assert!(!paths.chroot_dir.exists());
    let apply = paths.build_path.join("stages/base_debootstrap/apply.sh");
    assert_eq!(
        fs::metadata(apply).unwrap().permissions().mode() & 0o777,
        0o755
    );
    // The builder's own settings survive; ours are appended after them.
    assert_file_contains(&paths.settings_path, "base_debootstrap_arch=amd64\n");
}

#[test]
fn test_resumed_prepare_keeps_existing_tree() {
    let t = TestEnv::new();
    let env = t.environment(EnvSnapshot::new());
    let paths = env.paths();

    env.prepare_build(BuildMode::Fresh).unwrap();
    fs::write(paths.build_path.join("stage-marker"), "done").unwrap();
    fs::create_dir_all(&paths.chroot_dir).unwrap();
    fs::write(paths.chroot_dir.join("rootfs-file"), "built").unwrap();
    fs::write(t.builder_source.join("lib/new_helper.bash"), "echo\n").unwrap();

    env.prepare_build(BuildMode::Resumed).unwrap();

    assert!(paths.build_path.join("stage-marker").exists());
    assert!(paths.chroot_dir.join("rootfs-file").exists());
    assert!(paths.build_path.join("lib/new_helper.bash").exists());
    assert_dir_exists(&paths.work_path.join("stemcell"));
}

#[test]
fn test_resumed_prepare_on_empty_tree() {
    let t = TestEnv::new();
    let env = t.environment(EnvSnapshot::new());

    // Nothing exists yet; resuming still stages everything it needs.
    env.prepare_build(BuildMode::Resumed).unwrap();
    assert_eq!(entry_names(&env.paths().build_path), vec!["etc", "lib", "stages"]);
    assert!(env.paths().settings_path.is_file());
}

#[test]
fn test_settings_lines_are_assignments() {
    let t = TestEnv::new();
    let env = t.environment(snapshot(&[("BUILD_TIME", "1700000000")]));

    env.prepare_build(BuildMode::Fresh).unwrap();

    let line_re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*=.*$").unwrap();
    let lines = last_settings_block(&env.paths().settings_path);
    let expected = env.settings().unwrap();

    assert_eq!(lines.len(), expected.len());
    let mut keys = HashSet::new();
    for line in &lines {
        assert!(line_re.is_match(line), "not an assignment: {}", line);
        let (key, _) = line.split_once('=').unwrap();
        assert!(keys.insert(key.to_string()), "duplicate key {}", key);
    }
    assert!(lines.contains(&"stemcell_version=777".to_string()));
    assert!(lines.contains(&"stemcell_image_name=google-kvm-ubuntu.raw".to_string()));
    assert!(lines.contains(&"BUILD_TIME=1700000000".to_string()));
}

#[test]
fn test_settings_are_appended_on_resume() {
    let t = TestEnv::new();
    let env = t.environment(EnvSnapshot::new());

    env.prepare_build(BuildMode::Fresh).unwrap();
    env.prepare_build(BuildMode::Resumed).unwrap();

    // Resume re-copies the builder's settings.bash, then appends once.
    let content = fs::read_to_string(&env.paths().settings_path).unwrap();
    assert_eq!(content.matches("# ====================").count(), 1);
    assert!(content.starts_with("base_debootstrap_arch=amd64\n"));
}

#[test]
fn test_build_time_line_only_when_available() {
    let t = TestEnv::new();

    let env = t.environment(EnvSnapshot::new());
    env.prepare_build(BuildMode::Fresh).unwrap();
    let lines = last_settings_block(&env.paths().settings_path);
    assert!(!lines.iter().any(|l| l.starts_with("BUILD_TIME=")));

    fs::write(&t.build_time_marker, "20261017T120000Z\n").unwrap();
    let env = t.environment(snapshot(&[("BUILD_TIME", "ignored")]));
    env.prepare_build(BuildMode::Fresh).unwrap();
    let lines = last_settings_block(&env.paths().settings_path);
    assert!(lines.contains(&"BUILD_TIME=20261017T120000Z".to_string()));
}

#[test]
fn test_missing_builder_source_aborts() {
    let t = TestEnv::new();
    fs::remove_dir_all(&t.builder_source).unwrap();
    let env = t.environment(EnvSnapshot::new());

    let err = env.prepare_build(BuildMode::Fresh).unwrap_err();

    assert!(err
        .to_string()
        .contains(&t.builder_source.display().to_string()));
    assert!(!env.paths().work_root.exists());
    assert!(!env.paths().settings_path.exists());
}

#[test]
fn test_fresh_prepare_removes_stray_archives() {
    let t = TestEnv::new();
    fs::write(t.artifacts_dir.join("bosh-stemcell-776.tgz"), "").unwrap();
    fs::write(t.artifacts_dir.join("keep.txt"), "").unwrap();

    t.environment(EnvSnapshot::new())
        .prepare_build(BuildMode::Fresh)
        .unwrap();

    assert_eq!(entry_names(&t.artifacts_dir), vec!["keep.txt"]);
}

#[test]
fn test_resumed_prepare_keeps_archives() {
    let t = TestEnv::new();
    fs::write(t.artifacts_dir.join("bosh-stemcell-776.tgz"), "").unwrap();

    t.environment(EnvSnapshot::new())
        .prepare_build(BuildMode::Resumed)
        .unwrap();

    assert!(t.artifacts_dir.join("bosh-stemcell-776.tgz").exists());
}

#[test]
fn test_distinct_targets_are_isolated() {
    let t = TestEnv::new();
    let google = t.environment(EnvSnapshot::new());
    let mut aws_def = google_definition();
    aws_def.infrastructure = stemcell_builder::Infrastructure::for_name("aws", None).unwrap();
    let aws = t.environment_for(aws_def, EnvSnapshot::new());

    google.prepare_build(BuildMode::Fresh).unwrap();
    fs::write(google.paths().build_path.join("google-only"), "").unwrap();
    aws.prepare_build(BuildMode::Fresh).unwrap();

    assert_ne!(google.paths().base_directory, aws.paths().base_directory);
    assert!(google.paths().build_path.join("google-only").exists());
}

#[test]
fn test_equal_inputs_resolve_equal_paths() {
    let t = TestEnv::new();
    let a = t.environment(EnvSnapshot::new());
    let b = t.environment(snapshot(&[("HTTP_PROXY", "http://x")]));
    assert_eq!(a.paths(), b.paths());
}

#[test]
fn test_escaping_os_name_never_reaches_the_filesystem() {
    let t = TestEnv::new();
    let outside = t.mount_root.parent().unwrap().join("outside");
    fs::create_dir_all(&outside).unwrap();
    fs::write(outside.join("keep.txt"), "keep").unwrap();

    let definition = Definition::new(
        Infrastructure::for_name("google", Some("kvm")).unwrap(),
        OperatingSystem::new(outside.to_str().unwrap(), "jammy"),
    );
    let result = BuildEnvironment::new(
        EnvSnapshot::new(),
        definition,
        "777",
        &t.os_image_tarball,
        t.options(),
    );

    assert!(result.is_err());
    assert!(outside.join("keep.txt").is_file());
}
