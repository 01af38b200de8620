//! CLI subcommand implementations.

pub mod serve;
pub mod status;
pub mod token;

use std::path::Path;

use mailpilot_types::AppConfig;

/// Load configuration from an explicit path or the discovery chain.
pub(crate) fn load_config(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_from(Path::new(path))?,
        None => AppConfig::load()?,
    };
    Ok(config)
}
