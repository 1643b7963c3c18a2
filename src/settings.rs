//! Settings handed to the shell build pipeline.
//!
//! Settings are derived on demand and only ever exist on disk as `KEY=VALUE`
//! lines appended to `settings.bash`.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::definition::Definition;
use crate::paths::stemcell_image_name;

/// Snapshot of the process environment, taken once by the caller.
pub type EnvSnapshot = BTreeMap<String, String>;

/// Proxy variables forwarded to the pipeline, matched case-insensitively.
pub const PROXY_KEEP_LIST: [&str; 3] = ["HTTP_PROXY", "HTTPS_PROXY", "NO_PROXY"];

pub const BUILD_TIME_KEY: &str = "BUILD_TIME";

/// Separator written before each batch of persisted settings.
pub const SETTINGS_SEPARATOR: &str = "====================";

/// Ordered setting-name to value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    entries: Vec<(String, String)>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a setting, keeping first-insertion order.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Settings for a build target.
    pub fn for_target(
        definition: &Definition,
        version: &str,
        os_image_tarball: &Path,
        disk_size: Option<u32>,
        build_time: Option<&str>,
    ) -> Self {
        let infra = &definition.infrastructure;
        let os = &definition.operating_system;

        let mut settings = Settings::new();
        settings.set("stemcell_image_name", stemcell_image_name(definition));
        settings.set("stemcell_version", version);
        settings.set("stemcell_hypervisor", infra.hypervisor.as_str());
        settings.set("stemcell_infrastructure", infra.name.as_str());
        settings.set("stemcell_operating_system", os.name.as_str());
        settings.set("stemcell_operating_system_version", os.version.as_str());
        if let Some(variant) = &os.variant {
            settings.set("stemcell_operating_system_variant", variant.as_str());
        }
        settings.set("stemcell_agent", definition.agent.name());
        settings.set(
            "image_create_disk_size",
            disk_size.unwrap_or(infra.default_disk_size).to_string(),
        );
        settings.set("os_image_tgz", os_image_tarball.to_string_lossy());
        if let Some(build_time) = build_time {
            settings.set(BUILD_TIME_KEY, build_time);
        }
        settings
    }

    /// Render the block appended to `settings.bash`.
    pub fn to_bash(&self) -> String {
        let mut out = format!("\n# {}\n\n", SETTINGS_SEPARATOR);
        for (key, value) in self.iter() {
            out.push_str(&format!("{}={}\n", key, value));
        }
        out
    }

    /// Append the settings block to `path`, creating the file if needed.
    pub fn append_to(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open settings file {}", path.display()))?;
        file.write_all(self.to_bash().as_bytes())
            .with_context(|| format!("Failed to write settings file {}", path.display()))?;
        Ok(())
    }
}

/// Resolve the build time: marker file first, then the environment.
pub fn build_time(marker_file: &Path, env: &EnvSnapshot) -> Result<Option<String>> {
    if marker_file.exists() {
        let content = fs::read_to_string(marker_file)
            .with_context(|| format!("Failed to read {}", marker_file.display()))?;
        let content = content.strip_suffix('\n').unwrap_or(&content);
        let content = content.strip_suffix('\r').unwrap_or(content);
        return Ok(Some(content.to_string()));
    }
    Ok(env.get(BUILD_TIME_KEY).cloned())
}

/// Proxy variables to forward, keyed by their original spelling.
///
/// One entry per logical name. When several casings are present the last
/// one in snapshot order wins.
pub fn proxy_settings(env: &EnvSnapshot) -> Vec<(String, String)> {
    let mut picked: Vec<(&str, (String, String))> = Vec::new();
    for (key, value) in env {
        let upper = key.to_ascii_uppercase();
        let Some(logical) = PROXY_KEEP_LIST.iter().copied().find(|name| *name == upper) else {
            continue;
        };
        let entry = (key.clone(), value.clone());
        match picked.iter().position(|(name, _)| *name == logical) {
            Some(index) => picked[index].1 = entry,
            None => picked.push((logical, entry)),
        }
    }
    picked.into_iter().map(|(_, entry)| entry).collect()
}

/// `KEY='value'` pairs joined by spaces.
pub fn hash_as_bash_env<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}='{}'", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}
