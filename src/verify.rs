//! Command lines for the stemcell verification suite.
//!
//! The suite is an rspec project that tags its checks with
//! `exclude_on_<infrastructure>` / `exclude_on_<variant>`. These builders only
//! produce the command strings; running them is up to the caller.

use std::path::Path;

use crate::definition::{Definition, InfrastructureKind};
use crate::paths::StemcellPaths;

/// Exclusion flag for a known infrastructure.
pub fn infrastructure_exclusion(kind: InfrastructureKind) -> &'static str {
    match kind {
        InfrastructureKind::Alicloud => "--tag ~exclude_on_alicloud",
        InfrastructureKind::Aws => "--tag ~exclude_on_aws",
        InfrastructureKind::Azure => "--tag ~exclude_on_azure",
        InfrastructureKind::Cloudstack => "--tag ~exclude_on_cloudstack",
        InfrastructureKind::Google => "--tag ~exclude_on_google",
        InfrastructureKind::Openstack => "--tag ~exclude_on_openstack",
        InfrastructureKind::Softlayer => "--tag ~exclude_on_softlayer",
        InfrastructureKind::Vcloud => "--tag ~exclude_on_vcloud",
        InfrastructureKind::Vsphere => "--tag ~exclude_on_vsphere",
        InfrastructureKind::Warden => "--tag ~exclude_on_warden",
    }
}

/// All exclusion flags for a target: infrastructure first, then OS variant.
pub fn exclusion_flags(definition: &Definition) -> Vec<String> {
    let mut flags = Vec::new();
    if let Some(kind) = definition.infrastructure.kind() {
        flags.push(infrastructure_exclusion(kind).to_string());
    }
    if let Some(variant) = &definition.operating_system.variant {
        flags.push(format!("--tag ~exclude_on_{}", variant));
    }
    flags
}

fn operating_system_spec_name(definition: &Definition) -> String {
    format!(
        "{}_{}",
        definition.operating_system.name, definition.operating_system.version
    )
}

/// Checks against the bare OS image tarball.
pub fn os_image_rspec_command(
    specs_dir: &Path,
    definition: &Definition,
    os_image_tarball: &Path,
) -> String {
    [
        format!("cd {};", specs_dir.display()),
        format!("OS_IMAGE={}", os_image_tarball.display()),
        "bundle exec rspec -fd".to_string(),
        format!("spec/os_image/{}_spec.rb", operating_system_spec_name(definition)),
    ]
    .join(" ")
}

/// Checks against the finished stemcell image.
pub fn stemcell_rspec_command(
    specs_dir: &Path,
    definition: &Definition,
    version: &str,
    paths: &StemcellPaths,
) -> String {
    let os = &definition.operating_system;
    let spec_name = operating_system_spec_name(definition);

    let mut rspec = "bundle exec rspec -fd".to_string();
    for flag in exclusion_flags(definition) {
        rspec.push(' ');
        rspec.push_str(&flag);
    }

    let mut cmd = vec![
        format!("cd {};", specs_dir.display()),
        format!("STEMCELL_IMAGE={}", paths.image_file_path.display()),
        format!("STEMCELL_WORKDIR={}", paths.work_path.display()),
        format!("OS_NAME={}", os.name),
        format!("OS_VERSION={}", os.version),
        format!("CANDIDATE_BUILD_NUMBER={}", version),
        rspec,
        format!("spec/os_image/{}_spec.rb", spec_name),
        format!("spec/stemcells/{}_spec.rb", spec_name),
        "spec/stemcells/go_agent_spec.rb".to_string(),
        format!("spec/stemcells/{}_spec.rb", definition.infrastructure.name),
        "spec/stemcells/stig_spec.rb".to_string(),
        "spec/stemcells/cis_spec.rb".to_string(),
    ];
    if let Some(variant) = &os.variant {
        cmd.push(format!("spec/stemcells/{}_spec.rb", variant));
    }
    cmd.join(" ")
}
