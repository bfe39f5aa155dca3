use std::time::Duration;

use internal::service::barista_service::{BaristaConfig, WasteWaterPosition};
use serde::Deserialize;

#[derive(Deserialize, Clone)]
pub struct BaristaAppConfig {
    pub waste_water_position: PositionConfig,
    pub default_moving_speed: f64,
    pub low_temperature_fallback: f64,
    pub connect_retries: u32,
    pub ack_poll_interval_ms: u64,
    pub ack_timeout_ms: u64,
    pub stability_max_rounds: u32,
}

#[derive(Deserialize, Clone, Copy)]
pub struct PositionConfig {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl BaristaAppConfig {
    pub fn to_domain(&self) -> BaristaConfig {
        BaristaConfig {
            waste_water_position: WasteWaterPosition {
                x: self.waste_water_position.x,
                y: self.waste_water_position.y,
                z: self.waste_water_position.z,
            },
            default_moving_speed: self.default_moving_speed,
            low_temperature_fallback: self.low_temperature_fallback,
            connect_retries: self.connect_retries,
            ack_poll_interval: Duration::from_millis(self.ack_poll_interval_ms),
            ack_timeout: Duration::from_millis(self.ack_timeout_ms),
            stability_max_rounds: self.stability_max_rounds,
        }
    }
}
