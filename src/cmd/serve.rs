//! Board service command: `quickboard serve`.

use std::path::PathBuf;

use anyhow::Result;
use quickboard::config::QuickboardConfig;
use quickboard::service::server::{ServerConfig, start_server};

pub async fn cmd_serve(
    config: QuickboardConfig,
    port: Option<u16>,
    db_path: Option<PathBuf>,
    dev: bool,
) -> Result<()> {
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    let mut server = ServerConfig::from(config.server);
    if let Some(port) = port {
        server.port = port;
    }
    if let Some(db_path) = db_path {
        server.db_path = db_path;
    }
    server.dev_mode = dev;

    start_server(server).await
}
