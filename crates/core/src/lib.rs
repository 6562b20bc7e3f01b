pub mod config;
pub mod error;
pub mod types;

pub use config::{CONFIG_FILE, parse_snapshot_toml, parse_snapshot_toml_str};
pub use error::{Error, Result};
pub use types::*;
