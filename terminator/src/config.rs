//! This module defines the configuration file.

use std::{fs, path::Path, time::Duration};

use anyhow::ensure;
use serde::{Deserialize, Serialize};

use crate::requeue::ExponentialBackoff;

pub const DEFAULT_FIELD_MANAGER: &str = "sidecar-terminator";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Only watch `Sidecar` resources in this namespace. Rules may still target any namespace.
    pub watch_namespace: Option<String>,
    /// Maximum number of sidecars reconciled at the same time.
    pub concurrency: u16,
    /// Field manager recorded on status writes.
    pub field_manager: String,
    pub requeue: RequeueConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RequeueConfig {
    pub initial_delay_seconds: u64,
    pub max_delay_seconds: u64,
    pub multiplier: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            concurrency: 4,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            requeue: RequeueConfig::default(),
        }
    }
}

impl Default for RequeueConfig {
    fn default() -> Self {
        Self {
            initial_delay_seconds: 5,
            max_delay_seconds: 300,
            multiplier: 2.0,
        }
    }
}

impl RequeueConfig {
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(
            Duration::from_secs(self.initial_delay_seconds),
            Duration::from_secs(self.max_delay_seconds),
            self.multiplier,
        )
    }
}

impl Config {
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(file_path: &Path) -> anyhow::Result<Self> {
        let config_content = fs::read_to_string(file_path)?;
        Self::from_str(&config_content)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.concurrency > 0, "concurrency must be at least 1");
        ensure!(!self.field_manager.is_empty(), "fieldManager must not be empty");
        ensure!(
            self.requeue.initial_delay_seconds <= self.requeue.max_delay_seconds,
            "requeue.initialDelaySeconds must not exceed requeue.maxDelaySeconds"
        );
        ensure!(
            self.requeue.multiplier >= 1.0,
            "requeue.multiplier must be at least 1.0"
        );
        Ok(())
    }
}
