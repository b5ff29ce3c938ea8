pub mod actions;
pub mod config;
pub mod dispatch;
pub mod init;
pub mod interpret;
pub mod serve;

use anyhow::Context;
use inkdesk_agent::RestGateway;
use inkdesk_core::config::Config;
use inkdesk_core::gateway::{Gateway, MemoryGateway};
use std::path::Path;
use std::sync::Arc;

pub fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load(root).context("failed to load config")
}

/// The backend to run against: the configured REST gateway, or an empty
/// in-memory one with `--offline`.
pub fn gateway(config: &Config, offline: bool) -> anyhow::Result<Arc<dyn Gateway>> {
    if offline {
        tracing::info!("using in-memory backend");
        return Ok(Arc::new(MemoryGateway::offline()));
    }
    let gw = RestGateway::from_config(&config.gateway)
        .context("cannot connect to the studio backend (pass --offline to use an in-memory one)")?;
    Ok(Arc::new(gw))
}
