//! Configuration management for the spin machine
//!
//! TOML file, then environment overrides, then validation.

use crate::errors::{ConfigurationError, SpinResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

pub const DEFAULT_FREE_SPIN_DELAY_SECS: u64 = 86_400;

/// Complete machine configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MachineConfig {
    pub prizes: Vec<u64>,
    pub free_spin_delay_secs: u64,
    pub extra_spin_price: u64,
    pub randomness: RandomnessConfig,
    pub service: ServiceConfig,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            prizes: Vec::new(),
            free_spin_delay_secs: DEFAULT_FREE_SPIN_DELAY_SECS,
            extra_spin_price: 0,
            randomness: RandomnessConfig::default(),
            service: ServiceConfig::default(),
        }
    }
}

/// Randomness provider selection
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RandomnessMode {
    /// Derived from the settlement step; cheap, predictable within a step
    InBand,
    /// Fed by an operator
    OutOfBand,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RandomnessConfig {
    pub mode: RandomnessMode,
    /// Held value of an out-of-band provider before its first update
    pub initial_value: u64,
}

impl Default for RandomnessConfig {
    fn default() -> Self {
        Self {
            mode: RandomnessMode::InBand,
            initial_value: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Capacity of the command queue in front of the machine
    pub command_buffer: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            command_buffer: 1024,
        }
    }
}

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> SpinResult<MachineConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            MachineConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> SpinResult<MachineConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(&self, config: &mut MachineConfig) -> SpinResult<()> {
        if let Ok(delay) = env::var("SPIN_MACHINE_FREE_SPIN_DELAY") {
            config.free_spin_delay_secs = delay.parse().map_err(|_| ConfigurationError::InvalidValue {
                field: "SPIN_MACHINE_FREE_SPIN_DELAY".to_string(),
                value: delay,
                reason: "Invalid number of seconds".to_string(),
            })?;
        }

        if let Ok(price) = env::var("SPIN_MACHINE_EXTRA_SPIN_PRICE") {
            config.extra_spin_price = price.parse().map_err(|_| ConfigurationError::InvalidValue {
                field: "SPIN_MACHINE_EXTRA_SPIN_PRICE".to_string(),
                value: price,
                reason: "Invalid amount".to_string(),
            })?;
        }

        if let Ok(mode) = env::var("SPIN_MACHINE_RANDOMNESS") {
            config.randomness.mode = match mode.as_str() {
                "in_band" => RandomnessMode::InBand,
                "out_of_band" => RandomnessMode::OutOfBand,
                _ => {
                    return Err(ConfigurationError::InvalidValue {
                        field: "SPIN_MACHINE_RANDOMNESS".to_string(),
                        value: mode,
                        reason: "Expected in_band or out_of_band".to_string(),
                    }
                    .into())
                }
            };
        }

        if let Ok(prizes) = env::var("SPIN_MACHINE_PRIZES") {
            config.prizes = parse_prize_list(&prizes).ok_or_else(|| ConfigurationError::InvalidValue {
                field: "SPIN_MACHINE_PRIZES".to_string(),
                value: prizes.clone(),
                reason: "Expected a comma separated list of amounts".to_string(),
            })?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self, config: &MachineConfig) -> SpinResult<()> {
        if config.prizes.is_empty() {
            return Err(ConfigurationError::MissingRequired("prizes".to_string()).into());
        }

        if config.service.command_buffer == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "service.command_buffer".to_string(),
                value: "0".to_string(),
                reason: "Command buffer cannot be zero".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &MachineConfig, path: &str) -> SpinResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

fn parse_prize_list(raw: &str) -> Option<Vec<u64>> {
    raw.split(',')
        .map(|part| part.trim().parse::<u64>().ok())
        .collect()
}

/// Builder pattern for creating configurations
pub struct ConfigBuilder {
    config: MachineConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: MachineConfig::default(),
        }
    }

    pub fn prizes(mut self, prizes: Vec<u64>) -> Self {
        self.config.prizes = prizes;
        self
    }

    pub fn free_spin_delay_secs(mut self, delay: u64) -> Self {
        self.config.free_spin_delay_secs = delay;
        self
    }

    pub fn extra_spin_price(mut self, price: u64) -> Self {
        self.config.extra_spin_price = price;
        self
    }

    pub fn randomness(mut self, mode: RandomnessMode, initial_value: u64) -> Self {
        self.config.randomness = RandomnessConfig {
            mode,
            initial_value,
        };
        self
    }

    pub fn command_buffer(mut self, capacity: usize) -> Self {
        self.config.service.command_buffer = capacity;
        self
    }

    pub fn build(self) -> MachineConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration used when no file is given
pub fn sample_config() -> MachineConfig {
    ConfigBuilder::new()
        .prizes(vec![0, 10, 20, 50, 100])
        .extra_spin_price(25)
        .build()
}

/// Write a sample configuration file
pub fn generate_sample_config(path: &str) -> SpinResult<()> {
    ConfigLoader::new().save(&sample_config(), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = MachineConfig::default();
        assert_eq!(config.free_spin_delay_secs, 86_400);
        assert_eq!(config.extra_spin_price, 0);
        assert_eq!(config.randomness.mode, RandomnessMode::InBand);
        assert_eq!(config.service.command_buffer, 1024);
    }

    #[test]
    fn test_config_validation() {
        let loader = ConfigLoader::new();
        let mut config = ConfigBuilder::new().prizes(vec![100]).build();

        assert!(loader.validate(&config).is_ok());

        config.service.command_buffer = 0;
        assert!(loader.validate(&config).is_err());

        config.service.command_buffer = 1;
        config.prizes.clear();
        assert!(loader.validate(&config).is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .prizes(vec![10, 20])
            .free_spin_delay_secs(1_000)
            .extra_spin_price(100)
            .randomness(RandomnessMode::OutOfBand, 7)
            .build();

        assert_eq!(config.prizes, vec![10, 20]);
        assert_eq!(config.free_spin_delay_secs, 1_000);
        assert_eq!(config.extra_spin_price, 100);
        assert_eq!(config.randomness.mode, RandomnessMode::OutOfBand);
        assert_eq!(config.randomness.initial_value, 7);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: MachineConfig = toml::from_str("prizes = [1, 2, 3]\n").unwrap();

        assert_eq!(config.prizes, vec![1, 2, 3]);
        assert_eq!(config.free_spin_delay_secs, DEFAULT_FREE_SPIN_DELAY_SECS);
        assert_eq!(config.randomness.mode, RandomnessMode::InBand);
    }

    #[test]
    fn test_randomness_mode_from_toml() {
        let config: MachineConfig =
            toml::from_str("prizes = [1]\n[randomness]\nmode = \"out_of_band\"\ninitial_value = 9\n").unwrap();

        assert_eq!(config.randomness.mode, RandomnessMode::OutOfBand);
        assert_eq!(config.randomness.initial_value, 9);
    }

    #[test]
    fn test_parse_prize_list() {
        assert_eq!(parse_prize_list("10, 20,30"), Some(vec![10, 20, 30]));
        assert_eq!(parse_prize_list("10,x"), None);
    }

    #[test]
    fn test_save_and_load_config() -> SpinResult<()> {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        generate_sample_config(path)?;
        let loaded = ConfigLoader::new().with_path(path).load()?;

        assert_eq!(loaded.prizes, vec![0, 10, 20, 50, 100]);
        assert_eq!(loaded.extra_spin_price, 25);

        Ok(())
    }
}
