//! User configuration (`config.toml`)
//!
//! Looked up at `$TALLY_CONFIG`, else `<config_home>/tally/config.toml`.
//! Every key is optional and a missing file means defaults.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::db::AssetType;
use crate::error::PortfolioError;
use crate::reports::{RankingPolicy, Rates};

pub const CONFIG_ENV: &str = "TALLY_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Ledger database; `--db` takes precedence
    pub database: Option<PathBuf>,
    pub rates: Rates,
    pub report: RankingPolicy,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dir_spec::config_home().map(|dir| dir.join("tally").join("config.toml"))
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(?path, "no config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config = Self::from_toml_str(&raw)
            .with_context(|| format!("Invalid config file {:?}", path))?;

        debug!(?path, ?config, "loaded config");
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(raw).map_err(|e| PortfolioError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for asset_type in AssetType::ALL {
            let rate = self.rates.for_asset(asset_type);
            if rate <= Decimal::ZERO {
                return Err(PortfolioError::ConfigError(format!(
                    "rate for {} must be positive, got {}",
                    asset_type, rate
                ))
                .into());
            }
        }
        Ok(())
    }
}
