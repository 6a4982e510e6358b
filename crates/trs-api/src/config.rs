//! Runtime server configuration.

use std::path::PathBuf;

use serde::Deserialize;
use trs_core::reference::ReferenceData;
use trs_store_sqlite::DEFAULT_TRN_RANGE_START;

/// Server configuration, deserialised from `config.toml` layered under
/// `TRS_`-prefixed environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  pub store_path:      PathBuf,
  /// First TRN a fresh store allocates.
  #[serde(default = "default_trn_range_start")]
  pub trn_range_start: u32,
  /// Known ITT providers and qualification subjects, used by intake
  /// validation.
  #[serde(default)]
  pub reference:       ReferenceData,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_trn_range_start() -> u32 { DEFAULT_TRN_RANGE_START }
