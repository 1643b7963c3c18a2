//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `prepare` - Stage the build environment
//! - `show` - Display paths, settings, configuration
//! - `verify` - Print or run verification suite commands

pub mod prepare;
pub mod show;
pub mod verify;

pub use prepare::cmd_prepare;
pub use show::cmd_show;
pub use verify::{cmd_verify, cmd_verify_command};
