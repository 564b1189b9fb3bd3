//! CLI command implementations.
//!
//! | Module    | Commands handled                     |
//! |-----------|--------------------------------------|
//! | `serve`   | `Serve`                              |
//! | `auth`    | `Register`, `Login`, `Logout`        |
//! | `board`   | `Board`, `Column`, `Card`            |
//! | `config`  | `Config`                             |

pub mod auth;
pub mod board;
pub mod config;
pub mod serve;

pub use auth::{cmd_login, cmd_logout, cmd_register};
pub use board::{cmd_board, cmd_card, cmd_column};
pub use config::cmd_config;
pub use serve::cmd_serve;

use std::sync::Arc;

use anyhow::{Context, Result};
use quickboard::client::{BoardApi, HttpBoardClient};
use quickboard::config::QuickboardConfig;

use super::Cli;

/// Resolve configuration: file, then environment, then global CLI flags.
pub fn load_config(cli: &Cli) -> Result<QuickboardConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let _ = dotenvy::dotenv();
            let mut config = QuickboardConfig::load(path)?;
            config.apply_env(|key| std::env::var(key).ok())?;
            config
        }
        None => {
            let cwd = std::env::current_dir().context("Failed to get current directory")?;
            QuickboardConfig::discover(&cwd)?
        }
    };
    if let Some(url) = &cli.server_url {
        config.client.server_url = url.clone();
    }
    Ok(config)
}

pub(crate) fn http_client(config: &QuickboardConfig) -> Result<Arc<dyn BoardApi>> {
    let client = HttpBoardClient::new(&config.client.server_url, config.client.request_timeout())
        .context("Failed to build HTTP client")?;
    Ok(Arc::new(client))
}
