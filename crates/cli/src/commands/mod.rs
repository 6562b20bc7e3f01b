pub mod build;
pub mod init;
pub mod preview;
pub mod validate;

use anyhow::{Context, Result};
use pagesnap_core::{CONFIG_FILE, SnapshotConfig, parse_snapshot_toml};
use std::path::Path;
use tracing::debug;

/// Load the named config, else snapshot.toml from the working directory,
/// else the built-in defaults
pub fn load_config(explicit: Option<&Path>) -> Result<SnapshotConfig> {
    if let Some(path) = explicit {
        return parse_snapshot_toml(path)
            .with_context(|| format!("Failed to load {}", path.display()));
    }

    let local = Path::new(CONFIG_FILE);
    if local.exists() {
        debug!("using ./{}", CONFIG_FILE);
        return parse_snapshot_toml(local)
            .with_context(|| format!("Failed to load {}", CONFIG_FILE));
    }

    debug!("no {} found, using defaults", CONFIG_FILE);
    Ok(SnapshotConfig::default())
}
