use std::time::Duration;

use thiserror::Error;

/// Failures of the message-bus contract. Disconnection and timeout are
/// recoverable signals surfaced as values, never panics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BusError {
    #[error("bus is not connected")]
    NotConnected,
    #[error("bus is already started")]
    AlreadyStarted,
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("no handler registered for method '{0}'")]
    UnknownMethod(String),
    #[error("remote returned an error: {0}")]
    Rpc(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum ExecutorError {
    #[error("barista is busy")]
    Busy,
    #[error("calibration failed: {0}")]
    Calibration(String),
    #[error("no temperature reading from {0}")]
    SensorUnavailable(&'static str),
    #[error("extrusion requested before any target temperature was set")]
    NoMixPercentage,
    #[error("device '{device}' did not acknowledge within {timeout:?}")]
    DeviceTimeout {
        device: &'static str,
        timeout: Duration,
    },
    #[error("brew was stopped")]
    Stopped,
    #[error("something wrong happened: {0}")]
    Technical(String),
}

/// Hardware wiring resolution errors. Logged and the dependent device is
/// omitted; never silently dropped.
#[derive(Error, Debug, PartialEq)]
pub enum WiringError {
    #[error("device '{name}' references unknown hardware '{dependency}'")]
    UnresolvedDependency { name: String, dependency: String },
    #[error("unknown hardware kind '{0}'")]
    UnknownKind(String),
    #[error("device '{name}' is misconfigured: {reason}")]
    InvalidEntry { name: String, reason: String },
}
