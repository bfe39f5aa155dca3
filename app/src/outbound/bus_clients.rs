//! RPC clients for the auxiliary services the controller talks to over the
//! bus: the refill pump and the two temperature sensor services.

use std::sync::Arc;
use std::time::Duration;

use log::warn;
use serde_json::{Value, json};

use internal::port::bus::MessageBus;
use internal::port::probe::{RefillPort, TemperatureProbePort};

/// Client for a temperature sensor service answering `get_temperature` with
/// `{"temperature": <f64>}`. A bus failure is reported as "no reading".
pub struct TemperatureClient<B: MessageBus> {
    bus: Arc<B>,
    target: String,
    timeout: Duration,
}

impl<B: MessageBus> TemperatureClient<B> {
    pub fn new(bus: Arc<B>, target: String, timeout: Duration) -> Self {
        TemperatureClient {
            bus,
            target,
            timeout,
        }
    }
}

impl<B> TemperatureProbePort for TemperatureClient<B>
where
    B: MessageBus + Send + Sync,
{
    async fn temperature(&self) -> Option<f64> {
        match self
            .bus
            .req(&self.target, "get_temperature", json!({}), self.timeout)
            .await
        {
            Ok(value) => value.get("temperature").and_then(Value::as_f64),
            Err(err) => {
                warn!("no temperature from '{}': {err}", self.target);
                None
            }
        }
    }
}

/// Client for the background refill service, paused around each brew.
pub struct RefillClient<B: MessageBus> {
    bus: Arc<B>,
    target: String,
    timeout: Duration,
}

impl<B: MessageBus> RefillClient<B> {
    pub fn new(bus: Arc<B>, target: String, timeout: Duration) -> Self {
        RefillClient {
            bus,
            target,
            timeout,
        }
    }

    async fn call(&self, method: &str) -> anyhow::Result<()> {
        self.bus
            .req(&self.target, method, json!({}), self.timeout)
            .await
            .map(|_| ())
            .map_err(|err| anyhow::anyhow!("refill '{method}' failed: {err}"))
    }
}

impl<B> RefillPort for RefillClient<B>
where
    B: MessageBus + Send + Sync,
{
    async fn start(&self) -> anyhow::Result<()> {
        self.call("start").await
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.call("stop").await
    }
}
