use crate::domain::{error::ExecutorError, point::Point, temperature::TemperatureRange};
use crate::port::{pid::PidPort, probe::TemperatureProbePort};
use crate::service::{time_transformer::TimeTransformer, water_transformer::WaterTransformer};

/// The two cooperating transform stages: temperature to mix ratio, then
/// distance to duration. Owned exclusively by the executor loop.
pub struct PointPipeline<P: PidPort, O: TemperatureProbePort> {
    water: WaterTransformer<P, O>,
    time: TimeTransformer,
}

impl<P: PidPort, O: TemperatureProbePort> PointPipeline<P, O> {
    pub fn new(pid: P, output_temp: O) -> Self {
        PointPipeline {
            water: WaterTransformer::new(pid, output_temp),
            time: TimeTransformer::default(),
        }
    }

    pub async fn transform(&mut self, point: &mut Point) -> Result<(), ExecutorError> {
        self.water.transform(point).await?;
        self.time.transform(point);
        Ok(())
    }

    /// Restores both stages to their initial state. The calibrated range
    /// survives; it is set once per controller lifetime.
    pub fn reset(&mut self) {
        self.water.reset();
        self.time.reset();
    }

    pub fn reset_position(&mut self) {
        self.time.reset();
    }

    pub fn range(&self) -> TemperatureRange {
        self.water.range()
    }

    pub fn set_low(&mut self, low: f64) {
        self.water.set_low(low);
    }

    pub fn set_high(&mut self, high: f64) {
        self.water.set_high(high);
    }

    pub async fn output_temperature(&self) -> Option<f64> {
        self.water.output_temperature().await
    }
}
