use std::{fs, path::Path};

use anyhow::anyhow;
use serde::Deserialize;

use super::{
    barista_config::BaristaAppConfig, bus_config::BusConfig, hardware_config::HardwareEntry,
};

#[derive(Deserialize)]
pub struct AppConfig {
    pub bus: BusConfig,
    pub barista: BaristaAppConfig,
    pub services: ServicesConfig,
    #[serde(default)]
    pub hardware: Vec<HardwareEntry>,
}

/// Bus paths of the auxiliary collaborators the controller calls.
#[derive(Deserialize, Clone)]
pub struct ServicesConfig {
    pub refill: String,
    pub output_temp: String,
    pub tank_temp: String,
    pub request_timeout_ms: u64,
}

impl AppConfig {
    pub fn load(file_name: &str) -> anyhow::Result<AppConfig> {
        let project_root = env!("CARGO_MANIFEST_DIR");
        let file_path = Path::new(project_root).join(file_name);
        let content = fs::read_to_string(file_path)
            .map_err(|err| anyhow!("Could not read config file: {:?}", err))?;
        toml::from_str(&content).map_err(|err| anyhow!("Could not parse TOML config: {:?}", err))
    }
}
