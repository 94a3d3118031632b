use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IoResultExt, Result};
use crate::hash::HashAlgorithm;
use crate::wait::WaitCondition;

fn default_algorithm() -> HashAlgorithm {
    HashAlgorithm::Sha1
}

fn default_poll_interval() -> u64 {
    5
}

/// store configuration stored in config.toml
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// digest used for new content
    #[serde(default = "default_algorithm")]
    pub algorithm: HashAlgorithm,
    /// seconds between lock attempts; 0 waits until interrupted
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Config {
    /// load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).with_path(path)?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// a fresh waiter paced by the configured poll interval
    pub fn waiter(&self) -> WaitCondition {
        WaitCondition::new(self.poll_interval())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}
