//! Configuration view and validation: `quickboard config`.

use anyhow::Result;
use quickboard::config::QuickboardConfig;

use super::super::ConfigCommands;

pub fn cmd_config(config: &QuickboardConfig, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Quickboard Configuration");
            println!("========================");
            println!();
            println!("[server]");
            println!("  port = {}", config.server.port);
            println!("  db_path = \"{}\"", config.server.db_path.display());
            println!("  secret_key = <{} chars>", config.server.secret_key.len());
            println!("  token_ttl_hours = {}", config.server.token_ttl_hours);
            println!();
            println!("[client]");
            println!("  server_url = \"{}\"", config.client.server_url);
            println!("  debounce_ms = {}", config.client.debounce_ms);
            println!(
                "  request_timeout_secs = {}",
                config.client.request_timeout_secs
            );
            println!(
                "  session_file = \"{}\"",
                config.client.session_file().display()
            );
            println!();
        }
        Some(ConfigCommands::Validate) => {
            let warnings = config.validate();
            if warnings.is_empty() {
                println!("{}", console::style("Configuration is valid.").green());
            } else {
                println!("{}", console::style("Configuration warnings:").yellow());
                for warning in &warnings {
                    println!("  - {}", warning);
                }
            }
        }
    }
    Ok(())
}
