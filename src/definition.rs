//! Build target descriptors.
//!
//! A [`Definition`] names what is being built: the infrastructure (and its
//! hypervisor), the operating system and the agent. It is supplied once and
//! never mutated.

use anyhow::{bail, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Default root disk size for most infrastructures, in MiB.
pub const DEFAULT_DISK_SIZE: u32 = 5120;

/// Disk image format produced for an infrastructure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskFormat {
    Raw,
    Rawdisk,
    Qcow2,
    Ovf,
    Vhd,
    Files,
}

impl DiskFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiskFormat::Raw => "raw",
            DiskFormat::Rawdisk => "rawdisk",
            DiskFormat::Qcow2 => "qcow2",
            DiskFormat::Ovf => "ovf",
            DiskFormat::Vhd => "vhd",
            DiskFormat::Files => "files",
        }
    }
}

impl fmt::Display for DiskFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiskFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw" => Ok(DiskFormat::Raw),
            "rawdisk" => Ok(DiskFormat::Rawdisk),
            "qcow2" => Ok(DiskFormat::Qcow2),
            "ovf" => Ok(DiskFormat::Ovf),
            "vhd" => Ok(DiskFormat::Vhd),
            "files" => Ok(DiskFormat::Files),
            other => bail!("Unknown disk format '{}'", other),
        }
    }
}

/// The closed set of infrastructures the builder knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfrastructureKind {
    Alicloud,
    Aws,
    Azure,
    Cloudstack,
    Google,
    Openstack,
    Softlayer,
    Vcloud,
    Vsphere,
    Warden,
}

impl InfrastructureKind {
    pub const ALL: [InfrastructureKind; 10] = [
        InfrastructureKind::Alicloud,
        InfrastructureKind::Aws,
        InfrastructureKind::Azure,
        InfrastructureKind::Cloudstack,
        InfrastructureKind::Google,
        InfrastructureKind::Openstack,
        InfrastructureKind::Softlayer,
        InfrastructureKind::Vcloud,
        InfrastructureKind::Vsphere,
        InfrastructureKind::Warden,
    ];

    /// Look up a known infrastructure by name. Returns `None` for anything
    /// outside the table.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            InfrastructureKind::Alicloud => "alicloud",
            InfrastructureKind::Aws => "aws",
            InfrastructureKind::Azure => "azure",
            InfrastructureKind::Cloudstack => "cloudstack",
            InfrastructureKind::Google => "google",
            InfrastructureKind::Openstack => "openstack",
            InfrastructureKind::Softlayer => "softlayer",
            InfrastructureKind::Vcloud => "vcloud",
            InfrastructureKind::Vsphere => "vsphere",
            InfrastructureKind::Warden => "warden",
        }
    }

    pub fn default_hypervisor(&self) -> &'static str {
        match self {
            InfrastructureKind::Alicloud => "kvm",
            InfrastructureKind::Aws => "xen",
            InfrastructureKind::Azure => "hyperv",
            InfrastructureKind::Cloudstack => "xen",
            InfrastructureKind::Google => "kvm",
            InfrastructureKind::Openstack => "kvm",
            InfrastructureKind::Softlayer => "esxi",
            InfrastructureKind::Vcloud => "esxi",
            InfrastructureKind::Vsphere => "esxi",
            InfrastructureKind::Warden => "boshlite",
        }
    }

    pub fn default_disk_size(&self) -> u32 {
        match self {
            InfrastructureKind::Openstack => 3072,
            InfrastructureKind::Warden => 2048,
            _ => DEFAULT_DISK_SIZE,
        }
    }

    /// Disk formats produced for this infrastructure; the first is the default.
    pub fn disk_formats(&self) -> Vec<DiskFormat> {
        match self {
            InfrastructureKind::Alicloud | InfrastructureKind::Aws => vec![DiskFormat::Raw],
            InfrastructureKind::Azure | InfrastructureKind::Cloudstack => vec![DiskFormat::Vhd],
            InfrastructureKind::Google => vec![DiskFormat::Rawdisk],
            InfrastructureKind::Openstack => vec![DiskFormat::Qcow2, DiskFormat::Raw],
            InfrastructureKind::Softlayer
            | InfrastructureKind::Vcloud
            | InfrastructureKind::Vsphere => vec![DiskFormat::Ovf],
            InfrastructureKind::Warden => vec![DiskFormat::Files],
        }
    }
}

/// Infrastructure the stemcell targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Infrastructure {
    pub name: String,
    pub hypervisor: String,
    /// Root disk size in MiB.
    pub default_disk_size: u32,
    pub disk_formats: Vec<DiskFormat>,
}

impl Infrastructure {
    /// Descriptor for a known infrastructure. `hypervisor` overrides the
    /// table default when given.
    pub fn known(kind: InfrastructureKind, hypervisor: Option<&str>) -> Self {
        Self {
            name: kind.name().to_string(),
            hypervisor: hypervisor.unwrap_or(kind.default_hypervisor()).to_string(),
            default_disk_size: kind.default_disk_size(),
            disk_formats: kind.disk_formats(),
        }
    }

    /// Descriptor for an infrastructure outside the known table.
    pub fn custom(name: &str, hypervisor: &str, disk_formats: Vec<DiskFormat>) -> Self {
        Self {
            name: name.to_string(),
            hypervisor: hypervisor.to_string(),
            default_disk_size: DEFAULT_DISK_SIZE,
            disk_formats,
        }
    }

    /// Resolve by name: known names use the table, anything else becomes a
    /// custom descriptor with a single raw disk format and needs a hypervisor.
    pub fn for_name(name: &str, hypervisor: Option<&str>) -> Result<Self> {
        match InfrastructureKind::from_name(name) {
            Some(kind) => Ok(Self::known(kind, hypervisor)),
            None => match hypervisor {
                Some(hypervisor) => Ok(Self::custom(name, hypervisor, vec![DiskFormat::Raw])),
                None => bail!(
                    "Unknown infrastructure '{}': a hypervisor must be given explicitly",
                    name
                ),
            },
        }
    }

    pub fn kind(&self) -> Option<InfrastructureKind> {
        InfrastructureKind::from_name(&self.name)
    }

    pub fn default_disk_format(&self) -> Option<DiskFormat> {
        self.disk_formats.first().copied()
    }
}

/// Operating system baked into the stemcell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatingSystem {
    pub name: String,
    pub version: String,
    pub variant: Option<String>,
}

impl OperatingSystem {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            variant: None,
        }
    }

    pub fn with_variant(mut self, variant: &str) -> Self {
        self.variant = Some(variant.to_string());
        self
    }
}

/// Agent installed on the stemcell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Agent {
    #[default]
    Go,
}

impl Agent {
    pub fn name(&self) -> &'static str {
        match self {
            Agent::Go => "go",
        }
    }
}

/// Everything that identifies a build target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Definition {
    pub infrastructure: Infrastructure,
    pub operating_system: OperatingSystem,
    pub agent: Agent,
}

impl Definition {
    pub fn new(infrastructure: Infrastructure, operating_system: OperatingSystem) -> Self {
        Self {
            infrastructure,
            operating_system,
            agent: Agent::Go,
        }
    }

    /// `{infra}-{hypervisor}-{os}-{os_version}-go_agent[-{disk_format}]`.
    ///
    /// The disk format suffix only appears for non-default formats.
    pub fn stemcell_name(&self, disk_format: DiskFormat) -> String {
        let mut name = format!(
            "{}-{}-{}",
            self.infrastructure.name, self.infrastructure.hypervisor, self.operating_system.name
        );
        if !self.operating_system.version.is_empty() {
            name.push('-');
            name.push_str(&self.operating_system.version);
        }
        name.push_str(&format!("-{}_agent", self.agent.name()));
        if self.infrastructure.default_disk_format() != Some(disk_format) {
            name.push('-');
            name.push_str(disk_format.as_str());
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_infrastructure_lookup() {
        let aws = Infrastructure::for_name("aws", None).unwrap();
        assert_eq!(aws.hypervisor, "xen");
        assert_eq!(aws.disk_formats, vec![DiskFormat::Raw]);
        assert_eq!(aws.kind(), Some(InfrastructureKind::Aws));
    }

    #[test]
    fn test_hypervisor_override() {
        let google = Infrastructure::for_name("google", Some("kvm")).unwrap();
        assert_eq!(google.hypervisor, "kvm");
        let vsphere = Infrastructure::for_name("vsphere", Some("esxi7")).unwrap();
        assert_eq!(vsphere.hypervisor, "esxi7");
    }

    #[test]
    fn test_unknown_infrastructure_requires_hypervisor() {
        assert!(Infrastructure::for_name("mystery", None).is_err());
        let custom = Infrastructure::for_name("mystery", Some("qemu")).unwrap();
        assert_eq!(custom.kind(), None);
        assert_eq!(custom.default_disk_size, DEFAULT_DISK_SIZE);
    }

    #[test]
    fn test_disk_format_parse() {
        assert_eq!("qcow2".parse::<DiskFormat>().unwrap(), DiskFormat::Qcow2);
        assert!("vmdk".parse::<DiskFormat>().is_err());
    }

    #[test]
    fn test_stemcell_name_default_format() {
        let def = Definition::new(
            Infrastructure::for_name("openstack", None).unwrap(),
            OperatingSystem::new("ubuntu", "jammy"),
        );
        assert_eq!(
            def.stemcell_name(DiskFormat::Qcow2),
            "openstack-kvm-ubuntu-jammy-go_agent"
        );
        assert_eq!(
            def.stemcell_name(DiskFormat::Raw),
            "openstack-kvm-ubuntu-jammy-go_agent-raw"
        );
    }
}
