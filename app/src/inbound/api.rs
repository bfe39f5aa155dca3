//! Controller RPC surface: builds the bus handlers for the `brew` and `get`
//! methods on top of a [`BaristaDriverPort`].

use std::sync::Arc;

use log::warn;
use serde_json::{Value, json};

use internal::domain::brew::{BrewRequest, BrewStep};
use internal::port::{barista::BaristaDriverPort, bus::RpcHandler};

use crate::inbound::model::rpc::BrewStepData;

/// `brew` accepts an ordered list of command/point descriptors and enqueues
/// them. A full queue is a structured error result, not an RPC failure.
pub fn brew_handler<H>(handle: H) -> RpcHandler
where
    H: BaristaDriverPort + Clone + Send + Sync + 'static,
{
    Arc::new(move |parameters| {
        let handle = handle.clone();
        Box::pin(async move {
            let request = parse_request(&parameters)?;
            match handle.submit(request) {
                Ok(()) => Ok(json!({"status": "ok"})),
                Err(err) => Ok(json!({"status": "error", "message": err.to_string()})),
            }
        })
    })
}

/// `get` returns the current status snapshot.
pub fn get_handler<H>(handle: H) -> RpcHandler
where
    H: BaristaDriverPort + Clone + Send + Sync + 'static,
{
    Arc::new(move |_parameters| {
        let handle = handle.clone();
        Box::pin(async move { Ok(json!({"status": handle.status().status})) })
    })
}

/// Invalid descriptors are logged and skipped; they never abort the rest of
/// the request.
fn parse_request(parameters: &Value) -> Result<BrewRequest, String> {
    let descriptors = parameters
        .get("points")
        .and_then(Value::as_array)
        .ok_or_else(|| "brew request without 'points'".to_string())?;

    let mut steps = Vec::new();
    for descriptor in descriptors {
        let step = serde_json::from_value::<BrewStepData>(descriptor.clone())
            .map_err(|err| err.to_string())
            .and_then(|data| BrewStep::try_from(data).map_err(|err| err.to_string()));
        match step {
            Ok(step) => steps.push(step),
            Err(err) => warn!("skipping invalid descriptor {descriptor}: {err}"),
        }
    }
    Ok(BrewRequest::new(steps))
}
