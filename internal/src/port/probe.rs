/// Temperature reading collaborator (output nozzle, tank). `None` means the
/// sensor produced no reading; the caller decides whether that is fatal.
#[cfg_attr(test, mockall::automock)]
pub trait TemperatureProbePort {
    fn temperature(&self) -> impl Future<Output = Option<f64>> + Send;
}

/// Background water refill/top-up collaborator, paused around each brew.
#[cfg_attr(test, mockall::automock)]
pub trait RefillPort {
    fn start(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn stop(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
}
