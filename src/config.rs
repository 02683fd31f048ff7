use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::time::Duration;

use crate::dynamo_store::DynamoSettings;

pub const DEFAULT_BATTERY_ID: &str = "BAT-0x440";
pub const DEFAULT_REGION: &str = "ap-southeast-2";
pub const DEFAULT_TABLE: &str = "CAN_BMS_Data_Optimized";
pub const DEFAULT_LIMIT: u32 = 5;
pub const DEFAULT_TIME_WINDOW_SECS: u64 = 3600;
pub const DEFAULT_LATEST_INDEX: &str = "LatestDataIndex";
pub const DEFAULT_DAILY_INDEX: &str = "DailyBucketIndex";
pub const DEFAULT_LATEST_MARKER: &str = "LATEST";

/// Settings for one verification run
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct VerifierConfig {
    pub battery_id: String,
    pub region: String,
    pub table: String,
    pub limit: u32,
    pub time_window_secs: u64,
    pub check_gsi: bool,
    pub strict_buckets: bool,
    pub endpoint_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub latest_index: String,
    pub daily_index: String,
    pub latest_marker: String,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        VerifierConfig {
            battery_id: DEFAULT_BATTERY_ID.to_string(),
            region: DEFAULT_REGION.to_string(),
            table: DEFAULT_TABLE.to_string(),
            limit: DEFAULT_LIMIT,
            time_window_secs: DEFAULT_TIME_WINDOW_SECS,
            check_gsi: false,
            strict_buckets: false,
            endpoint_url: None,
            timeout_secs: None,
            latest_index: DEFAULT_LATEST_INDEX.to_string(),
            daily_index: DEFAULT_DAILY_INDEX.to_string(),
            latest_marker: DEFAULT_LATEST_MARKER.to_string(),
        }
    }
}

impl VerifierConfig {
    /// Rejects settings no query could be built from
    pub fn validate(&self) -> Result<()> {
        if self.battery_id.trim().is_empty() {
            bail!("battery id must not be empty");
        }
        if self.table.trim().is_empty() {
            bail!("table name must not be empty");
        }
        if self.limit == 0 {
            bail!("limit must be a positive integer");
        }
        if self.time_window_secs == 0 {
            bail!("time window must be a positive number of seconds");
        }
        if self.timeout_secs == Some(0) {
            bail!("timeout must be a positive number of seconds");
        }
        Ok(())
    }

    pub fn dynamo_settings(&self) -> DynamoSettings {
        DynamoSettings {
            region: self.region.clone(),
            table: self.table.clone(),
            endpoint_url: self.endpoint_url.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Loads settings from a JSON file; missing keys keep their defaults
pub fn load_config(path: &str) -> Result<VerifierConfig> {
    let mut file =
        File::open(path).with_context(|| format!("Error opening config file '{}'", path))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .with_context(|| format!("Error reading config file '{}'", path))?;

    serde_json::from_str::<VerifierConfig>(&contents)
        .with_context(|| format!("Error parsing config file '{}'", path))
}

/// Saves settings to a JSON file
pub fn save_config(config: &VerifierConfig, path: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    let mut file =
        File::create(path).with_context(|| format!("Error creating config file '{}'", path))?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

/// Values given explicitly on the command line; they win over the config file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub battery_id: Option<String>,
    pub region: Option<String>,
    pub table: Option<String>,
    pub limit: Option<u32>,
    pub time_window_secs: Option<u64>,
    pub check_gsi: bool,
    pub strict_buckets: bool,
    pub endpoint_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl ConfigOverrides {
    pub fn apply(self, mut config: VerifierConfig) -> VerifierConfig {
        if let Some(battery_id) = self.battery_id {
            config.battery_id = battery_id;
        }
        if let Some(region) = self.region {
            config.region = region;
        }
        if let Some(table) = self.table {
            config.table = table;
        }
        if let Some(limit) = self.limit {
            config.limit = limit;
        }
        if let Some(window) = self.time_window_secs {
            config.time_window_secs = window;
        }
        if self.endpoint_url.is_some() {
            config.endpoint_url = self.endpoint_url;
        }
        if self.timeout_secs.is_some() {
            config.timeout_secs = self.timeout_secs;
        }
        // flags can only switch a check on
        config.check_gsi |= self.check_gsi;
        config.strict_buckets |= self.strict_buckets;
        config
    }
}

/// Builds the effective settings: built-in defaults, then the optional file, then overrides
pub fn resolve_config(
    config_file: Option<&str>,
    overrides: ConfigOverrides,
) -> Result<VerifierConfig> {
    let base = match config_file {
        Some(path) => load_config(path)?,
        None => VerifierConfig::default(),
    };
    let config = overrides.apply(base);
    config.validate()?;
    Ok(config)
}
