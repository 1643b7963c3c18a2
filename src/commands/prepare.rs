//! Prepare command - stages the build environment.

use anyhow::Result;
use std::time::Instant;

use stemcell_builder::environment::{BuildEnvironment, BuildMode};

/// Execute the prepare command.
pub fn cmd_prepare(env: &BuildEnvironment, mode: BuildMode) -> Result<()> {
    let start = Instant::now();
    let paths = env.paths();

    match mode {
        BuildMode::Fresh => println!("=== Preparing fresh stemcell build ===\n"),
        BuildMode::Resumed => println!("=== Resuming stemcell build ===\n"),
    }

    env.prepare_build(mode)?;

    println!("\nBuild environment ready ({:.1}s)", start.elapsed().as_secs_f64());
    println!("  build path: {}", paths.build_path.display());
    println!("  work path:  {}", paths.work_path.display());
    println!("  settings:   {}", paths.settings_path.display());
    Ok(())
}
