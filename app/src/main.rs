mod config;
mod hw;
mod inbound;
mod outbound;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::error;

use internal::port::bus::MessageBus;
use internal::service::{barista_service::BaristaService, pipeline::PointPipeline};

use config::app_config::AppConfig;
use hw::wiring::Wiring;
use inbound::{api, nats::NatsBus};
use outbound::bus_clients::{RefillClient, TemperatureClient};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let conf = AppConfig::load("config.toml")?;

    let (hardware, failures) = Wiring::record(conf.hardware).resolve();
    for failure in &failures {
        error!("wiring: {failure}");
    }
    let moving = hardware.moving.context("no motion controller wired")?;
    let extruder = hardware.extruder.context("no extruder wired")?;
    let mix_pid = hardware.mix_pid.context("no mix pid wired")?;

    let bus = Arc::new(NatsBus::new(conf.bus));
    let request_timeout = Duration::from_millis(conf.services.request_timeout_ms);
    let output_temp = TemperatureClient::new(
        bus.clone(),
        conf.services.output_temp.clone(),
        request_timeout,
    );
    let tank_temp = TemperatureClient::new(
        bus.clone(),
        conf.services.tank_temp.clone(),
        request_timeout,
    );
    let refill = RefillClient::new(bus.clone(), conf.services.refill.clone(), request_timeout);

    let pipeline = PointPipeline::new(mix_pid, output_temp);
    let (handle, mut service) = BaristaService::new(
        moving,
        extruder,
        pipeline,
        tank_temp,
        refill,
        conf.barista.to_domain(),
    );

    bus.reg_rep("brew", api::brew_handler(handle.clone())).await?;
    bus.reg_rep("get", api::get_handler(handle)).await?;
    bus.start().await?;

    service.run().await
}
