//! Engine Configuration
//!
//! A small set of process-wide knobs. The defaults are what the engine uses
//! when nothing is installed; hosts that want different behavior parse a
//! JSON document and install it once at startup.
//!
//! ```rust,ignore
//! let config = EngineConfig::from_json(r#"{ "max_flush_passes": 16 }"#)?;
//! EngineConfig::install(config);
//! ```

use std::sync::OnceLock;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Process-wide engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How many times `runloop::flush` may drain the deferred queue in a
    /// single call before giving up. Deferred jobs that schedule more
    /// deferred jobs need one pass per generation.
    #[serde(default = "default_max_flush_passes")]
    pub max_flush_passes: usize,

    /// Whether helpers consult the owner's render introspection before
    /// notifying that a computed property changed.
    #[serde(default = "default_render_dedup")]
    pub render_dedup: bool,
}

fn default_max_flush_passes() -> usize {
    100
}

fn default_render_dedup() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_flush_passes: default_max_flush_passes(),
            render_dedup: default_render_dedup(),
        }
    }
}

static CONFIG: OnceLock<RwLock<EngineConfig>> = OnceLock::new();

fn get_config() -> &'static RwLock<EngineConfig> {
    CONFIG.get_or_init(|| RwLock::new(EngineConfig::default()))
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Replace the process-wide configuration.
    pub fn install(config: EngineConfig) {
        tracing::debug!(?config, "installing engine configuration");
        *get_config().write() = config;
    }

    /// Snapshot of the process-wide configuration.
    pub fn current() -> EngineConfig {
        get_config().read().clone()
    }
}
