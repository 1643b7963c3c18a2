//! Stemcell builder library exports.
//!
//! Path resolution, settings derivation and build-environment preparation
//! for stemcell images. The `stemcell` binary wraps these in a CLI.

pub mod config;
pub mod definition;
pub mod environment;
pub mod paths;
pub mod process;
pub mod settings;
pub mod telemetry;
pub mod timing;
pub mod verify;

pub use definition::{Agent, Definition, DiskFormat, Infrastructure, InfrastructureKind, OperatingSystem};
pub use environment::{BuildEnvironment, BuildMode, BuildOptions};
pub use paths::StemcellPaths;
pub use settings::{EnvSnapshot, Settings};
