//! Verify commands - print or run the verification suite.

use anyhow::{bail, Result};

use stemcell_builder::environment::BuildEnvironment;
use stemcell_builder::process;

/// Which verification suite invocation to produce.
#[derive(Debug, Clone, Copy)]
pub enum Suite {
    /// Checks against the OS image tarball
    OsImage,
    /// Checks against the finished stemcell
    Stemcell,
}

fn command_for(env: &BuildEnvironment, suite: Suite) -> String {
    match suite {
        Suite::OsImage => env.os_image_rspec_command(),
        Suite::Stemcell => env.stemcell_rspec_command(),
    }
}

/// Print the command line without running it.
pub fn cmd_verify_command(env: &BuildEnvironment, suite: Suite) -> Result<()> {
    println!("{}", command_for(env, suite));
    Ok(())
}

/// Run the verification suite with inherited stdio.
pub fn cmd_verify(env: &BuildEnvironment, suite: Suite) -> Result<()> {
    let specs_dir = &env.options().specs_dir;
    if !specs_dir.is_dir() {
        bail!(
            "Verification suite not found at {}. Set STEMCELL_SPECS_DIR.",
            specs_dir.display()
        );
    }

    let command = command_for(env, suite);
    println!("Running {:?} verification...\n  {}\n", suite, command);
    process::shell_interactive(&command)?;
    println!("\n{:?} verification passed.", suite);
    Ok(())
}
