use std::{net::IpAddr, path::Path};

use serde::{Deserialize, Serialize};

/// Values read from `--config`. Anything given on the command line or in the
/// environment wins over the file.
#[derive(Serialize, Deserialize, Default, Debug)]
pub struct Config {
    pub address: Option<IpAddr>,
    pub port: Option<u16>,
    pub max_request_size: Option<usize>,
    /// Seconds, `0` keeps resolved streams forever.
    pub cache_ttl: Option<u64>,
    pub cookies: Option<String>,
}

impl Config {
    pub fn load(file: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(file)?;
        let config = toml::from_str(&data)?;
        Ok(config)
    }
}
