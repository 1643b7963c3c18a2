//! stemcell - stemcell build environment coordinator.
//!
//! Resolves the on-disk layout for a stemcell build, stages the builder
//! sources and settings for the shell pipeline, and drives the
//! verification suite.

mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::Level;

use stemcell_builder::config::{self, Config};
use stemcell_builder::definition::{Definition, DiskFormat, Infrastructure, OperatingSystem};
use stemcell_builder::environment::{BuildEnvironment, BuildMode};
use stemcell_builder::settings::EnvSnapshot;
use stemcell_builder::telemetry;

#[derive(Parser)]
#[command(name = "stemcell")]
#[command(about = "Stemcell build environment coordinator")]
#[command(
    after_help = "QUICK START:\n  stemcell prepare --infrastructure aws --os-name ubuntu --os-version jammy \\\n      --stemcell-version 1.0 --os-image-tarball os-image.tgz\n  stemcell show paths ...          Print the resolved layout\n  stemcell verify stemcell ...     Run the stemcell verification suite"
)]
struct Cli {
    /// Project root holding stemcell_builder/ and bosh-stemcell/
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Identifies the stemcell being built.
#[derive(Args)]
struct TargetArgs {
    /// Infrastructure name (aws, google, openstack, vsphere, warden, ...)
    #[arg(long)]
    infrastructure: String,
    /// Hypervisor (default: the infrastructure's usual one)
    #[arg(long)]
    hypervisor: Option<String>,
    /// Operating system name (e.g. ubuntu)
    #[arg(long)]
    os_name: String,
    /// Operating system version (e.g. jammy)
    #[arg(long)]
    os_version: String,
    /// Operating system variant (e.g. fips)
    #[arg(long)]
    os_variant: Option<String>,
    /// Stemcell version / candidate build number
    #[arg(long)]
    stemcell_version: String,
    /// OS image tarball the stemcell is built from
    #[arg(long)]
    os_image_tarball: PathBuf,
    /// Disk formats to produce, comma separated (default: per infrastructure)
    #[arg(long, value_delimiter = ',')]
    disk_formats: Vec<DiskFormat>,
}

impl TargetArgs {
    fn definition(&self) -> Result<Definition> {
        let mut infrastructure =
            Infrastructure::for_name(&self.infrastructure, self.hypervisor.as_deref())?;
        if !self.disk_formats.is_empty() {
            infrastructure.disk_formats = self.disk_formats.clone();
        }
        let mut operating_system = OperatingSystem::new(&self.os_name, &self.os_version);
        if let Some(variant) = &self.os_variant {
            operating_system = operating_system.with_variant(variant);
        }
        Ok(Definition::new(infrastructure, operating_system))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Stage the build environment for the shell pipeline
    Prepare {
        #[command(flatten)]
        target: TargetArgs,
        /// Keep the existing build tree (same as setting resume_from)
        #[arg(long)]
        resume: bool,
    },

    /// Show information
    Show {
        #[arg(value_enum)]
        what: ShowTarget,
        #[command(flatten)]
        target: TargetArgs,
        /// Print paths/settings as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the verification suite command line
    VerifyCommand {
        #[arg(value_enum)]
        suite: Suite,
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Run the verification suite
    Verify {
        #[arg(value_enum)]
        suite: Suite,
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ShowTarget {
    /// Resolved filesystem layout
    Paths,
    /// Settings persisted to settings.bash
    Settings,
    /// Current configuration
    Config,
    /// env prefix with proxy and build time variables
    Env,
}

#[derive(Clone, Copy, ValueEnum)]
enum Suite {
    /// OS image checks
    OsImage,
    /// Full stemcell checks
    Stemcell,
}

impl From<Suite> for commands::verify::Suite {
    fn from(suite: Suite) -> Self {
        match suite {
            Suite::OsImage => commands::verify::Suite::OsImage,
            Suite::Stemcell => commands::verify::Suite::Stemcell,
        }
    }
}

fn build_environment(
    target: &TargetArgs,
    config: &Config,
    snapshot: &EnvSnapshot,
) -> Result<BuildEnvironment> {
    let artifacts_dir = std::env::current_dir().context("Failed to read current directory")?;
    BuildEnvironment::new(
        snapshot.clone(),
        target.definition()?,
        &target.stemcell_version,
        &target.os_image_tarball,
        config.build_options(&artifacts_dir),
    )
}

fn main() -> Result<()> {
    telemetry::init_tracing(Level::INFO);
    let cli = Cli::parse();
    let base_dir = cli
        .base_dir
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")));

    let snapshot = config::environment_snapshot(&base_dir);
    let config = Config::from_vars(&base_dir, &snapshot)?;

    match cli.command {
        Commands::Prepare { target, resume } => {
            let env = build_environment(&target, &config, &snapshot)?;
            let mode = if resume {
                BuildMode::Resumed
            } else {
                config.build_mode()
            };
            commands::cmd_prepare(&env, mode)?;
        }

        Commands::Show { what, target, json } => {
            let env = build_environment(&target, &config, &snapshot)?;
            let show_target = match what {
                ShowTarget::Paths => commands::show::ShowTarget::Paths { json },
                ShowTarget::Settings => commands::show::ShowTarget::Settings { json },
                ShowTarget::Config => commands::show::ShowTarget::Config,
                ShowTarget::Env => commands::show::ShowTarget::Env,
            };
            commands::cmd_show(&env, show_target, &config)?;
        }

        Commands::VerifyCommand { suite, target } => {
            let env = build_environment(&target, &config, &snapshot)?;
            commands::cmd_verify_command(&env, suite.into())?;
        }

        Commands::Verify { suite, target } => {
            let env = build_environment(&target, &config, &snapshot)?;
            commands::cmd_verify(&env, suite.into())?;
        }
    }

    Ok(())
}
