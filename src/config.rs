//! Configuration management for the airsinkd service.
//!
//! This module handles loading and saving configuration from disk. All
//! settings carry static defaults matching the stock behavior (2 second
//! poll, 5 second command timeout, sink named "AirPods"), so the service
//! runs without any file present and writes one out on first start.

use std::{
   env, fs,
   path::{Path, PathBuf},
   time::Duration,
};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::{AirSinkError, Result};

/// Main configuration structure for the service.
#[derive(Serialize, Deserialize, Clone)]
pub struct Config {
   /// Seconds between accessory status checks.
   #[serde(default = "default_poll_interval")]
   pub poll_interval_sec: u64,

   /// Timeout in seconds applied to every external command invocation.
   #[serde(default = "default_command_timeout")]
   pub command_timeout_sec: u64,

   /// Name used for the remap sink and searched for when tearing it down.
   #[serde(default = "default_sink_name")]
   pub sink_name: SmolStr,

   /// Command that prints the accessory status as a JSON object on stdout.
   #[serde(default = "default_status_command")]
   pub status_command: Vec<String>,
}

const fn default_poll_interval() -> u64 {
   2
}

const fn default_command_timeout() -> u64 {
   5
}

fn default_sink_name() -> SmolStr {
   SmolStr::new_static("AirPods")
}

fn default_status_command() -> Vec<String> {
   vec!["airstatus".to_string()]
}

impl Default for Config {
   fn default() -> Self {
      Self {
         poll_interval_sec: default_poll_interval(),
         command_timeout_sec: default_command_timeout(),
         sink_name: default_sink_name(),
         status_command: default_status_command(),
      }
   }
}

impl Config {
   /// Loads configuration from disk or creates default if not exists.
   pub fn load() -> Result<Self> {
      Self::load_from(&Self::config_path()?)
   }

   fn load_from(config_path: &Path) -> Result<Self> {
      if config_path.exists() {
         let contents = fs::read_to_string(config_path)?;
         Ok(toml::from_str(&contents)?)
      } else {
         // Create default config
         let config = Self::default();
         config.save_to(config_path)?;
         Ok(config)
      }
   }

   /// Saves the configuration to disk, creating the directory if needed.
   fn save_to(&self, config_path: &Path) -> Result<()> {
      // Ensure directory exists
      if let Some(parent) = config_path.parent() {
         fs::create_dir_all(parent)?;
      }

      let contents = toml::to_string_pretty(self)?;
      fs::write(config_path, contents)?;

      Ok(())
   }

   fn config_path() -> Result<PathBuf> {
      let config_dir = if let Ok(airsink_home) = env::var("AIRSINK_HOME") {
         PathBuf::from(airsink_home)
      } else if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
         PathBuf::from(config_home)
      } else if let Ok(home) = env::var("HOME") {
         PathBuf::from(home).join(".config")
      } else {
         return Err(AirSinkError::ConfigDirNotFound);
      };

      Ok(config_dir.join("airsinkd").join("config.toml"))
   }

   /// Delay between two consecutive status checks.
   pub fn poll_interval(&self) -> Duration {
      Duration::from_secs(self.poll_interval_sec)
   }

   /// Timeout applied to each external command.
   pub fn command_timeout(&self) -> Duration {
      Duration::from_secs(self.command_timeout_sec)
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_defaults_match_stock_behavior() {
      let config = Config::default();
      assert_eq!(config.poll_interval(), Duration::from_secs(2));
      assert_eq!(config.command_timeout(), Duration::from_secs(5));
      assert_eq!(config.sink_name, "AirPods");
      assert_eq!(config.status_command, vec!["airstatus".to_string()]);
   }

   #[test]
   fn test_load_creates_default_file() {
      let dir = tempfile::tempdir().expect("tempdir");
      let path = dir.path().join("airsinkd").join("config.toml");

      let config = Config::load_from(&path).expect("load");
      assert!(path.exists());
      assert_eq!(config.sink_name, "AirPods");

      // Reloading reads the file that was just written
      let reloaded = Config::load_from(&path).expect("reload");
      assert_eq!(reloaded.poll_interval_sec, config.poll_interval_sec);
   }

   #[test]
   fn test_partial_file_fills_defaults() {
      let dir = tempfile::tempdir().expect("tempdir");
      let path = dir.path().join("config.toml");
      fs::write(&path, "sink_name = \"AirPods Pro\"\n").expect("write");

      let config = Config::load_from(&path).expect("load");
      assert_eq!(config.sink_name, "AirPods Pro");
      assert_eq!(config.poll_interval_sec, 2);
      assert_eq!(config.command_timeout_sec, 5);
   }
}
