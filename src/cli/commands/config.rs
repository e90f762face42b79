//! Configuration inspection command.
//!
//! - `show`: the effective merged configuration
//! - `schema`: JSON Schema of the config file
//! - `path`: where config layers are read from

use crate::cli::ConfigCommands;
use crate::config::{self, CliOverrides, PROJECT_CONFIG_FILE, QaConfig, user_config_path};
use crate::error::Result;
use crate::output::OutputContext;
use serde_json::json;
use std::path::PathBuf;

/// Execute a config subcommand.
///
/// # Errors
///
/// Returns an error if config loading or serialization fails.
pub fn execute(command: &ConfigCommands, overrides: &CliOverrides, ctx: &OutputContext) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = config::load_config(overrides)?;
            if ctx.is_json() {
                ctx.json(&config)?;
            } else {
                print!("{}", serde_yaml::to_string(&config)?);
            }
        }
        ConfigCommands::Schema => {
            let schema = schemars::schema_for!(QaConfig);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        ConfigCommands::Path => {
            let home = std::env::var_os("HOME").map(PathBuf::from);
            let user = user_config_path(home.as_deref());
            let project = overrides
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
            if ctx.is_json() {
                ctx.json(&json!({
                    "user": user.as_ref().map(|p| p.display().to_string()),
                    "userExists": user.as_ref().is_some_and(|p| p.exists()),
                    "project": project.display().to_string(),
                    "projectExists": project.exists(),
                }))?;
            } else {
                let state = |exists: bool| if exists { "found" } else { "missing" };
                if let Some(user) = &user {
                    ctx.line(&format!("user:    {} ({})", user.display(), state(user.exists())));
                }
                ctx.line(&format!(
                    "project: {} ({})",
                    project.display(),
                    state(project.exists())
                ));
            }
        }
    }
    Ok(())
}
