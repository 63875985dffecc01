//! Server configuration types for tableside.
//!
//! `ServerConfig` represents the top-level `config.toml` that controls the
//! listen address, database file, hand-state delivery, and static assets.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the tableside server.
///
/// Loaded from `~/.tableside/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite file name, relative to the data directory.
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// How per-hand `your-state` messages are addressed after `update-state`.
    #[serde(default)]
    pub hand_delivery: HandDelivery,

    /// Directory of built client assets to serve. `None` uses the built-in default.
    #[serde(default)]
    pub web_dir: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    1999
}

fn default_database_file() -> String {
    "tableside.db".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_file: default_database_file(),
            hand_delivery: HandDelivery::default(),
            web_dir: None,
        }
    }
}

/// Addressing mode for personalized hand state.
///
/// - Unicast: only connections bound to the hand receive its `your-state`
/// - Broadcast: every connection receives every hand's `your-state` and is
///   trusted to discard the ones not addressed to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandDelivery {
    #[default]
    Unicast,
    Broadcast,
}
