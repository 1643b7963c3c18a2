//! Show command - displays information.

use anyhow::Result;

use stemcell_builder::config::Config;
use stemcell_builder::environment::BuildEnvironment;

/// Show target for the show command.
pub enum ShowTarget {
    /// Resolved filesystem layout
    Paths { json: bool },
    /// Settings that would be persisted
    Settings { json: bool },
    /// Current configuration
    Config,
    /// `env` prefix for pipeline commands
    Env,
}

/// Execute the show command.
pub fn cmd_show(env: &BuildEnvironment, target: ShowTarget, config: &Config) -> Result<()> {
    match target {
        ShowTarget::Paths { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(env.paths())?);
            } else {
                env.paths().print();
            }
        }
        ShowTarget::Settings { json } => {
            let settings = env.settings()?;
            if json {
                let map: serde_json::Map<String, serde_json::Value> = settings
                    .iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::from(v)))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                for (key, value) in settings.iter() {
                    println!("{}={}", key, value);
                }
            }
        }
        ShowTarget::Config => {
            config.print();
            println!();
            println!("Target:");
            println!("{}", serde_json::to_string_pretty(env.definition())?);
        }
        ShowTarget::Env => {
            println!("{}", env.command_env()?);
        }
    }
    Ok(())
}
