use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use internal::domain::{brew::BrewStep, point::Point};

/// Request envelope as carried on the wire: one per in-flight call.
#[derive(Serialize, Deserialize, Debug)]
pub struct RpcRequest {
    pub id: Uuid,
    pub method: String,
    #[serde(default)]
    pub parameters: Value,
}

impl RpcRequest {
    pub fn new(method: &str, parameters: Value) -> Self {
        RpcRequest {
            id: Uuid::new_v4(),
            method: method.into(),
            parameters,
        }
    }
}

/// Reply envelope: `result` on success, `error` otherwise, `id` echoed from
/// the request when it could be parsed.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct RpcReply {
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcReply {
    pub fn result(id: Uuid, result: Value) -> Self {
        RpcReply {
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Uuid>, error: String) -> Self {
        RpcReply {
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Raw point descriptor inside a brew request.
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct PointData {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub e: Option<f64>,
    pub t: Option<f64>,
    pub f: Option<f64>,
    pub time: Option<f64>,
}

impl From<PointData> for Point {
    fn from(data: PointData) -> Self {
        Point {
            x: data.x,
            y: data.y,
            z: data.z,
            e: data.e,
            t: data.t,
            f: data.f,
            time: data.time,
            ..Point::default()
        }
    }
}

/// One descriptor of a brew request: either a named command with parameters
/// or a raw point.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct BrewStepData {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub time: Option<u64>,
    pub t: Option<f64>,
    pub point: Option<PointData>,
}

impl TryFrom<BrewStepData> for BrewStep {
    type Error = anyhow::Error;

    fn try_from(data: BrewStepData) -> Result<Self> {
        if let Some(point) = data.point {
            return Ok(BrewStep::Points(vec![point.into()]));
        }
        if data.kind.as_deref() != Some("command") {
            bail!("descriptor is neither a command nor a point");
        }
        match data.name.as_deref() {
            Some("wait") => {
                let seconds = data.time.ok_or(anyhow!("wait command without 'time'"))?;
                Ok(BrewStep::Wait { seconds })
            }
            Some("calibration") => Ok(BrewStep::Calibration),
            Some("waste_water") => Ok(BrewStep::WasteWater),
            Some("mix") => {
                let target = data.t.ok_or(anyhow!("mix command without 't'"))?;
                Ok(BrewStep::Mix {
                    target_temperature: target,
                })
            }
            Some("home") => Ok(BrewStep::Home),
            Some(other) => bail!("unknown command '{other}'"),
            None => bail!("command descriptor without a name"),
        }
    }
}
