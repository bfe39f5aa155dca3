use std::time::Instant;

use crate::domain::{error::ExecutorError, point::Point, temperature::TemperatureRange};
use crate::port::{pid::PidPort, probe::TemperatureProbePort};

/// Volume extruded between two mix-ratio recomputations.
const ACCUMULATION_THRESHOLD: f64 = 10.0;

/// Splits each point's requested extrusion volume between the two water
/// sources so the output reaches the target temperature.
///
/// The baseline share comes from linear interpolation against the calibrated
/// range; every `ACCUMULATION_THRESHOLD` units of extruded volume the output
/// temperature is sampled and the PID correction is folded into the share.
pub struct WaterTransformer<P: PidPort, O: TemperatureProbePort> {
    pid: P,
    output_temp: O,
    range: TemperatureRange,
    accumulated: f64,
    target: Option<f64>,
    percentage: Option<f64>,
    previous_sample: Option<Instant>,
}

impl<P: PidPort, O: TemperatureProbePort> WaterTransformer<P, O> {
    pub fn new(pid: P, output_temp: O) -> Self {
        WaterTransformer {
            pid,
            output_temp,
            range: TemperatureRange::default(),
            accumulated: 0.0,
            target: None,
            percentage: None,
            previous_sample: None,
        }
    }

    pub async fn transform(&mut self, point: &mut Point) -> Result<(), ExecutorError> {
        if let Some(target) = point.t {
            if self.target != Some(target) {
                self.target = Some(target);
                self.percentage = self.range.percentage_for(target);
                self.resample();
            }
        }

        if let Some(e) = point.e {
            if self.accumulated >= ACCUMULATION_THRESHOLD {
                self.apply_correction().await?;
            }
            let percentage = self.percentage.ok_or(ExecutorError::NoMixPercentage)?;
            let e1 = e * percentage;
            point.e1 = Some(e1);
            point.e2 = Some(e - e1);
            self.accumulated += e;
        }
        Ok(())
    }

    async fn apply_correction(&mut self) -> Result<(), ExecutorError> {
        let measured = self
            .output_temp
            .temperature()
            .await
            .ok_or(ExecutorError::SensorUnavailable("output_temp"))?;
        let target = self.target.ok_or(ExecutorError::NoMixPercentage)?;
        let baseline = self.percentage.ok_or(ExecutorError::NoMixPercentage)?;

        let now = Instant::now();
        let dt = self
            .previous_sample
            .map(|previous| (now - previous).as_secs_f64())
            .unwrap_or(0.0);
        self.previous_sample = Some(now);

        let corrected = baseline + self.pid.correction(measured, target, dt) / 100.0;
        self.percentage = Some(corrected.clamp(0.0, 1.0));
        self.accumulated = 0.0;
        Ok(())
    }

    /// Clears everything, including the target and the mix share. Called
    /// between brews.
    pub fn reset(&mut self) {
        self.resample();
        self.target = None;
        self.percentage = None;
    }

    /// Clears the accumulator, the PID history and the sample clock while
    /// keeping the freshly computed target and share.
    fn resample(&mut self) {
        self.accumulated = 0.0;
        self.previous_sample = None;
        self.pid.reset();
    }

    pub fn range(&self) -> TemperatureRange {
        self.range
    }

    pub fn set_low(&mut self, low: f64) {
        self.range.low = Some(low);
    }

    pub fn set_high(&mut self, high: f64) {
        self.range.high = Some(high);
    }

    pub async fn output_temperature(&self) -> Option<f64> {
        self.output_temp.temperature().await
    }
}

#[cfg(test)]
mod test {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::port::pid::MockPidPort;

    struct ScriptedProbe {
        readings: Arc<Mutex<VecDeque<Option<f64>>>>,
    }

    impl ScriptedProbe {
        fn new(readings: &[Option<f64>]) -> Self {
            ScriptedProbe {
                readings: Arc::new(Mutex::new(readings.iter().copied().collect())),
            }
        }
    }

    impl TemperatureProbePort for ScriptedProbe {
        async fn temperature(&self) -> Option<f64> {
            self.readings.lock().unwrap().pop_front().unwrap_or(None)
        }
    }

    fn transformer_with(
        pid: MockPidPort,
        readings: &[Option<f64>],
    ) -> WaterTransformer<MockPidPort, ScriptedProbe> {
        let mut transformer = WaterTransformer::new(pid, ScriptedProbe::new(readings));
        transformer.set_low(20.0);
        transformer.set_high(80.0);
        transformer
    }

    fn quiet_pid() -> MockPidPort {
        let mut pid = MockPidPort::new();
        pid.expect_reset().returning(|| ());
        pid
    }

    #[tokio::test]
    async fn should_split_extrusion_by_baseline_percentage() {
        let mut transformer = transformer_with(quiet_pid(), &[]);

        let mut point = Point {
            e: Some(1.0),
            t: Some(50.0),
            time: Some(0.1),
            ..Point::default()
        };
        transformer.transform(&mut point).await.unwrap();

        // (50 - 20) / (80 - 20) = 0.5
        assert_eq!(point.e1, Some(0.5));
        assert_eq!(point.e2, Some(0.5));
        let total = point.e1.unwrap() + point.e2.unwrap();
        assert!((total - point.e.unwrap()).abs() < 1e-9);
    }

    #[tokio::test]
    async fn should_conserve_volume_across_targets() {
        let mut transformer = transformer_with(quiet_pid(), &[]);

        for (target, e) in [(25.0, 0.3), (65.0, 1.7), (80.0, 2.4)] {
            let mut point = Point {
                e: Some(e),
                t: Some(target),
                time: Some(0.1),
                ..Point::default()
            };
            transformer.transform(&mut point).await.unwrap();
            let e1 = point.e1.unwrap();
            let e2 = point.e2.unwrap();
            assert!((e1 + e2 - e).abs() < 1e-9);
            let share = e1 / e;
            assert!((0.0..=1.0).contains(&share));
        }
    }

    #[tokio::test]
    async fn should_apply_pid_correction_after_threshold() {
        let mut pid = quiet_pid();
        pid.expect_correction()
            .times(1)
            .returning(|_, _, _| -10.0);
        let mut transformer = transformer_with(pid, &[Some(70.0)]);

        let mut first = Point {
            e: Some(6.0),
            t: Some(50.0),
            time: Some(0.1),
            ..Point::default()
        };
        transformer.transform(&mut first).await.unwrap();
        assert_eq!(first.e1, Some(3.0));

        let mut second = Point::extrusion(6.0, 0.1);
        transformer.transform(&mut second).await.unwrap();
        assert_eq!(second.e1, Some(3.0));

        // 12 units accumulated: the next extrusion samples and corrects.
        let mut third = Point::extrusion(6.0, 0.1);
        transformer.transform(&mut third).await.unwrap();
        // 0.5 baseline - 10 / 100 = 0.4
        assert!((third.e1.unwrap() - 2.4).abs() < 1e-9);
        assert!((third.e2.unwrap() - 3.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn should_clamp_corrected_percentage() {
        let mut pid = quiet_pid();
        pid.expect_correction().returning(|_, _, _| 500.0);
        let mut transformer = transformer_with(pid, &[Some(30.0)]);

        let mut warm_up = Point {
            e: Some(12.0),
            t: Some(50.0),
            time: Some(0.1),
            ..Point::default()
        };
        transformer.transform(&mut warm_up).await.unwrap();

        let mut point = Point::extrusion(2.0, 0.1);
        transformer.transform(&mut point).await.unwrap();
        assert_eq!(point.e1, Some(2.0));
        assert_eq!(point.e2, Some(0.0));
    }

    #[tokio::test]
    async fn should_abort_when_sampling_fails() {
        let mut transformer = transformer_with(quiet_pid(), &[None]);

        let mut warm_up = Point {
            e: Some(12.0),
            t: Some(50.0),
            time: Some(0.1),
            ..Point::default()
        };
        transformer.transform(&mut warm_up).await.unwrap();

        let mut point = Point::extrusion(1.0, 0.1);
        let err = transformer.transform(&mut point).await.unwrap_err();
        assert_eq!(err, ExecutorError::SensorUnavailable("output_temp"));
    }

    #[tokio::test]
    async fn should_reject_extrusion_before_target_temperature() {
        let mut transformer = transformer_with(quiet_pid(), &[]);

        let mut point = Point::extrusion(1.0, 0.1);
        let err = transformer.transform(&mut point).await.unwrap_err();
        assert_eq!(err, ExecutorError::NoMixPercentage);
    }

    #[tokio::test]
    async fn should_pass_presplit_points_through() {
        let mut transformer = transformer_with(quiet_pid(), &[]);

        let mut point = Point {
            e1: Some(3.0),
            e2: Some(3.0),
            time: Some(0.1),
            ..Point::default()
        };
        transformer.transform(&mut point).await.unwrap();
        assert_eq!(point.e1, Some(3.0));
        assert_eq!(point.e2, Some(3.0));
    }

    #[tokio::test]
    async fn should_keep_range_across_reset() {
        let mut transformer = transformer_with(quiet_pid(), &[]);
        transformer.reset();
        assert_eq!(transformer.range().low, Some(20.0));
        assert_eq!(transformer.range().high, Some(80.0));
    }
}
