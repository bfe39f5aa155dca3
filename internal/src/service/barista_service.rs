use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, error, warn};
use tokio::sync::mpsc;

use crate::domain::{
    brew::{BrewRequest, BrewStep},
    error::ExecutorError,
    instruction::{self, ACK, HOME, INIT_SEQUENCE},
    point::Point,
};
use crate::port::{
    barista::{BaristaDriverPort, StatusSnapshot},
    device::DevicePort,
    pid::PidPort,
    probe::{RefillPort, TemperatureProbePort},
};
use crate::service::pipeline::PointPipeline;

/// Park position over the drain where purge, calibration and mix output go.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WasteWaterPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone)]
pub struct BaristaConfig {
    pub waste_water_position: WasteWaterPosition,
    pub default_moving_speed: f64,
    /// Used for the low bound when no calibration has run yet.
    pub low_temperature_fallback: f64,
    pub connect_retries: u32,
    pub ack_poll_interval: Duration,
    pub ack_timeout: Duration,
    /// Upper bound on stability-loop rounds in calibration and mix.
    pub stability_max_rounds: u32,
}

impl Default for BaristaConfig {
    fn default() -> Self {
        BaristaConfig {
            waste_water_position: WasteWaterPosition {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            default_moving_speed: 5000.0,
            low_temperature_fallback: 20.0,
            connect_retries: 3,
            ack_poll_interval: Duration::from_millis(100),
            ack_timeout: Duration::from_secs(30),
            stability_max_rounds: 200,
        }
    }
}

/// Cloneable RPC-facing half of the controller: enqueues requests and flips
/// the stop flag; never touches executor state directly.
#[derive(Clone)]
pub struct BaristaHandle {
    queue: mpsc::Sender<BrewRequest>,
    stop: Arc<AtomicBool>,
}

impl BaristaDriverPort for BaristaHandle {
    fn submit(&self, request: BrewRequest) -> Result<(), ExecutorError> {
        self.queue
            .try_send(request)
            .map_err(|_| ExecutorError::Busy)
    }

    fn status(&self) -> StatusSnapshot {
        StatusSnapshot::default()
    }

    fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Sequential brew executor. Owns both devices, the point pipeline and the
/// calibrated range; processes one request at a time from the capacity-1
/// queue.
pub struct BaristaService<M, E, P, O, T, R>
where
    M: DevicePort,
    E: DevicePort,
    P: PidPort,
    O: TemperatureProbePort,
    T: TemperatureProbePort,
    R: RefillPort,
{
    moving_dev: M,
    extruder_dev: E,
    pipeline: PointPipeline<P, O>,
    tank_temp: T,
    refill: R,
    queue: mpsc::Receiver<BrewRequest>,
    stop: Arc<AtomicBool>,
    config: BaristaConfig,
}

impl<M, E, P, O, T, R> BaristaService<M, E, P, O, T, R>
where
    M: DevicePort,
    E: DevicePort,
    P: PidPort,
    O: TemperatureProbePort,
    T: TemperatureProbePort,
    R: RefillPort,
{
    pub fn new(
        moving_dev: M,
        extruder_dev: E,
        pipeline: PointPipeline<P, O>,
        tank_temp: T,
        refill: R,
        config: BaristaConfig,
    ) -> (BaristaHandle, Self) {
        let (tx, rx) = mpsc::channel(1);
        let stop = Arc::new(AtomicBool::new(false));
        let handle = BaristaHandle {
            queue: tx,
            stop: stop.clone(),
        };
        let service = BaristaService {
            moving_dev,
            extruder_dev,
            pipeline,
            tank_temp,
            refill,
            queue: rx,
            stop,
            config,
        };
        (handle, service)
    }

    /// Connects the devices, runs the init sequence, then serves the queue
    /// until every handle is dropped.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.moving_dev.connect(self.config.connect_retries)?;
        self.extruder_dev.connect(self.config.connect_retries)?;
        for cmd in INIT_SEQUENCE {
            self.moving_dev
                .send(cmd)
                .map_err(|e| anyhow::anyhow!("init instruction '{cmd}' failed: {e}"))?;
            self.await_moving_ack().await?;
        }

        while let Some(request) = self.queue.recv().await {
            self.stop.store(false, Ordering::Relaxed);
            if let Err(err) = self.brew(&request).await {
                error!("brew aborted: {err}");
            }
        }
        Ok(())
    }

    /// Runs one request: pauses refill, ensures the temperature range is
    /// populated, resets the pipeline, executes every step in order. Refill
    /// is restarted whether the request succeeded or not.
    pub async fn brew(&mut self, request: &BrewRequest) -> Result<(), ExecutorError> {
        if let Err(err) = self.refill.stop().await {
            warn!("could not pause refill: {err}");
        }

        let result = self.execute(request).await;

        if let Err(err) = self.refill.start().await {
            warn!("could not restart refill: {err}");
        }
        result
    }

    async fn execute(&mut self, request: &BrewRequest) -> Result<(), ExecutorError> {
        let range = self.pipeline.range();
        if range.low.is_none() {
            self.pipeline.set_low(self.config.low_temperature_fallback);
        }
        if range.high.is_none() {
            let high = self
                .tank_temp
                .temperature()
                .await
                .ok_or(ExecutorError::SensorUnavailable("tank_temp"))?;
            self.pipeline.set_high(high);
        }

        self.pipeline.reset();
        for step in &request.steps {
            debug!("executing step '{}'", step.name());
            self.run_step(step).await?;
        }
        Ok(())
    }

    async fn run_step(&mut self, step: &BrewStep) -> Result<(), ExecutorError> {
        match step {
            BrewStep::Wait { seconds } => self.wait(*seconds).await,
            BrewStep::Calibration => self.calibrate().await,
            BrewStep::WasteWater => self.waste_water().await,
            BrewStep::Mix { target_temperature } => self.mix(*target_temperature).await,
            BrewStep::Home => self.home().await,
            BrewStep::Points(points) => self.handle_points(points).await,
        }
    }

    async fn wait(&self, seconds: u64) -> Result<(), ExecutorError> {
        let mut remaining = seconds;
        while remaining > 0 {
            if self.stop.load(Ordering::Relaxed) {
                return Err(ExecutorError::Stopped);
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
            remaining -= 1;
        }
        Ok(())
    }

    /// Establishes the temperature endpoints reached by pure flow from each
    /// source: pure source-2 gives the high bound, pure source-1 the low one.
    async fn calibrate(&mut self) -> Result<(), ExecutorError> {
        self.move_to_waste_water_position().await?;

        let source_2 = vec![
            Point {
                e2: Some(0.6),
                time: Some(0.1),
                ..Point::default()
            };
            50
        ];
        let high = self.stable_temperature(&source_2).await?;
        self.pipeline.set_high(high);

        let source_1 = vec![
            Point {
                e1: Some(0.6),
                time: Some(0.1),
                ..Point::default()
            };
            50
        ];
        let low = self.stable_temperature(&source_1).await?;
        self.pipeline.set_low(low);
        Ok(())
    }

    /// Drives `batch` repeatedly until the output temperature slope over a
    /// batch falls below the stability threshold, then returns the last
    /// sampled value.
    async fn stable_temperature(&mut self, batch: &[Point]) -> Result<f64, ExecutorError> {
        let mut previous = self
            .pipeline
            .output_temperature()
            .await
            .ok_or(ExecutorError::SensorUnavailable("output_temp"))?;
        for _ in 0..self.config.stability_max_rounds {
            if self.stop.load(Ordering::Relaxed) {
                return Err(ExecutorError::Stopped);
            }
            self.handle_points(batch).await?;
            let current = self
                .pipeline
                .output_temperature()
                .await
                .ok_or(ExecutorError::SensorUnavailable("output_temp"))?;
            if ((current - previous) / 5.0).abs() <= 3.0 / 5.0 {
                return Ok(current);
            }
            previous = current;
        }
        Err(ExecutorError::Calibration(format!(
            "no stable temperature within {} rounds",
            self.config.stability_max_rounds
        )))
    }

    /// Short balanced burst to flush the lines.
    async fn waste_water(&mut self) -> Result<(), ExecutorError> {
        self.move_to_waste_water_position().await?;
        let flush = vec![
            Point {
                e1: Some(3.0),
                e2: Some(3.0),
                time: Some(0.1),
                ..Point::default()
            };
            10
        ];
        self.handle_points(&flush).await
    }

    /// Drives small mixed batches until the output is within tolerance of
    /// the target and its slope between batches has flattened.
    async fn mix(&mut self, target: f64) -> Result<(), ExecutorError> {
        self.move_to_waste_water_position().await?;
        let batch = vec![
            Point {
                e: Some(0.5),
                t: Some(target),
                time: Some(0.1),
                ..Point::default()
            };
            20
        ];

        let mut previous = self
            .pipeline
            .output_temperature()
            .await
            .ok_or(ExecutorError::SensorUnavailable("output_temp"))?;
        for _ in 0..self.config.stability_max_rounds {
            if self.stop.load(Ordering::Relaxed) {
                return Err(ExecutorError::Stopped);
            }
            self.handle_points(&batch).await?;
            let current = self
                .pipeline
                .output_temperature()
                .await
                .ok_or(ExecutorError::SensorUnavailable("output_temp"))?;
            if (current - target).abs() < 0.5 && (current - previous).abs() < 3.0 / 5.0 {
                return Ok(());
            }
            previous = current;
        }
        Err(ExecutorError::Technical(format!(
            "mix did not reach {target} within {} rounds",
            self.config.stability_max_rounds
        )))
    }

    async fn home(&mut self) -> Result<(), ExecutorError> {
        self.moving_dev
            .send(HOME)
            .map_err(|e| ExecutorError::Technical(format!("home failed: {e}")))?;
        self.await_moving_ack().await?;
        self.pipeline.reset_position();
        Ok(())
    }

    async fn handle_points(&mut self, points: &[Point]) -> Result<(), ExecutorError> {
        for point in points {
            let mut point = point.clone();
            self.pipeline.transform(&mut point).await?;
            self.dispatch(&point).await?;
        }
        Ok(())
    }

    /// Sends the derived instruction codes to their devices, then polls each
    /// addressed device for the acknowledgment token.
    async fn dispatch(&mut self, point: &Point) -> Result<(), ExecutorError> {
        let motion = instruction::motion_code(point);
        let extrusion = instruction::extrusion_code(point);

        if let Some(code) = &motion {
            self.moving_dev
                .send(code)
                .map_err(|e| ExecutorError::Technical(format!("moving device: {e}")))?;
        }
        if let Some(code) = &extrusion {
            self.extruder_dev
                .send(code)
                .map_err(|e| ExecutorError::Technical(format!("extruder device: {e}")))?;
        }

        if motion.is_some() {
            self.await_moving_ack().await?;
        }
        if extrusion.is_some() {
            await_ack(
                &mut self.extruder_dev,
                "extruder",
                &self.stop,
                self.config.ack_poll_interval,
                self.config.ack_timeout,
            )
            .await?;
        }
        Ok(())
    }

    async fn await_moving_ack(&mut self) -> Result<(), ExecutorError> {
        await_ack(
            &mut self.moving_dev,
            "moving",
            &self.stop,
            self.config.ack_poll_interval,
            self.config.ack_timeout,
        )
        .await
    }

    async fn move_to_waste_water_position(&mut self) -> Result<(), ExecutorError> {
        let position = self.config.waste_water_position;
        let point = Point::move_point(
            position.x,
            position.y,
            position.z,
            self.config.default_moving_speed,
        );
        self.handle_points(&[point]).await
    }
}

/// Polls `device` at a fixed interval until the literal `ok` arrives. The
/// timeout bounds the wait; the stop flag breaks it early.
async fn await_ack<D: DevicePort>(
    device: &mut D,
    name: &'static str,
    stop: &AtomicBool,
    interval: Duration,
    timeout: Duration,
) -> Result<(), ExecutorError> {
    let deadline = Instant::now() + timeout;
    loop {
        if stop.load(Ordering::Relaxed) {
            return Err(ExecutorError::Stopped);
        }
        if Instant::now() >= deadline {
            return Err(ExecutorError::DeviceTimeout {
                device: name,
                timeout,
            });
        }
        if let Some(line) = device.recv() {
            if line.trim() == ACK {
                return Ok(());
            }
            continue;
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod test {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::port::{device::MockDevicePort, pid::MockPidPort};

    struct ScriptedProbe {
        readings: Mutex<VecDeque<Option<f64>>>,
    }

    impl ScriptedProbe {
        fn new(readings: &[Option<f64>]) -> Self {
            ScriptedProbe {
                readings: Mutex::new(readings.iter().copied().collect()),
            }
        }
    }

    impl TemperatureProbePort for ScriptedProbe {
        async fn temperature(&self) -> Option<f64> {
            self.readings.lock().unwrap().pop_front().unwrap_or(None)
        }
    }

    #[derive(Default)]
    struct RefillStub {
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
    }

    impl RefillPort for RefillStub {
        async fn start(&self) -> anyhow::Result<()> {
            self.starts.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.stops.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn acking_device() -> MockDevicePort {
        let mut device = MockDevicePort::new();
        device.expect_send().returning(|_| Ok(()));
        device.expect_recv().returning(|| Some("ok".into()));
        device
    }

    fn quiet_pid() -> MockPidPort {
        let mut pid = MockPidPort::new();
        pid.expect_reset().returning(|| ());
        pid.expect_correction().returning(|_, _, _| 0.0);
        pid
    }

    fn fast_config() -> BaristaConfig {
        BaristaConfig {
            ack_poll_interval: Duration::from_millis(1),
            ack_timeout: Duration::from_millis(50),
            stability_max_rounds: 10,
            ..BaristaConfig::default()
        }
    }

    type TestService =
        BaristaService<MockDevicePort, MockDevicePort, MockPidPort, ScriptedProbe, ScriptedProbe, RefillStub>;

    fn service_with(
        moving: MockDevicePort,
        extruder: MockDevicePort,
        output_readings: &[Option<f64>],
        tank_reading: Option<f64>,
    ) -> (BaristaHandle, TestService) {
        let pipeline = PointPipeline::new(quiet_pid(), ScriptedProbe::new(output_readings));
        BaristaService::new(
            moving,
            extruder,
            pipeline,
            ScriptedProbe::new(&[tank_reading]),
            RefillStub::default(),
            fast_config(),
        )
    }

    #[tokio::test]
    async fn should_reject_second_request_while_one_is_pending() {
        let (handle, mut service) =
            service_with(acking_device(), acking_device(), &[], Some(80.0));

        handle.submit(BrewRequest::new(vec![BrewStep::Home])).unwrap();
        let err = handle
            .submit(BrewRequest::new(vec![BrewStep::Home]))
            .unwrap_err();
        assert_eq!(err, ExecutorError::Busy);
        assert_eq!(err.to_string(), "barista is busy");

        // Once the pending request is consumed the queue accepts again.
        let request = service.queue.recv().await.unwrap();
        service.brew(&request).await.unwrap();
        handle.submit(BrewRequest::new(vec![BrewStep::Home])).unwrap();
    }

    #[tokio::test]
    async fn should_home_and_reset_position() {
        let mut moving = MockDevicePort::new();
        moving
            .expect_send()
            .withf(|cmd| cmd == "G28")
            .times(1)
            .returning(|_| Ok(()));
        moving.expect_recv().returning(|| Some("ok".into()));
        let extruder = MockDevicePort::new();

        let (_handle, mut service) = service_with(moving, extruder, &[], Some(80.0));
        service
            .brew(&BrewRequest::new(vec![BrewStep::Home]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn should_calibrate_to_stabilized_readings() {
        // First pair stabilizes at 79 (high), second at 29 (low).
        let readings = [Some(80.0), Some(79.0), Some(30.0), Some(29.0)];
        let (_handle, mut service) =
            service_with(acking_device(), acking_device(), &readings, Some(85.0));

        service
            .brew(&BrewRequest::new(vec![BrewStep::Calibration]))
            .await
            .unwrap();

        let range = service.pipeline.range();
        assert_eq!(range.high, Some(79.0));
        assert_eq!(range.low, Some(29.0));
    }

    #[tokio::test]
    async fn should_keep_sampling_until_slope_flattens() {
        // 80 -> 70 is above the threshold, 70 -> 69 is below; then the
        // low-bound pass stabilizes immediately.
        let readings = [Some(80.0), Some(70.0), Some(69.0), Some(30.0), Some(30.0)];
        let (_handle, mut service) =
            service_with(acking_device(), acking_device(), &readings, Some(85.0));

        service
            .brew(&BrewRequest::new(vec![BrewStep::Calibration]))
            .await
            .unwrap();

        let range = service.pipeline.range();
        assert_eq!(range.high, Some(69.0));
        assert_eq!(range.low, Some(30.0));
    }

    #[tokio::test]
    async fn should_abort_calibration_on_missing_reading() {
        let readings = [Some(80.0), None];
        let (_handle, mut service) =
            service_with(acking_device(), acking_device(), &readings, Some(85.0));

        let starts = service.refill.starts.clone();
        let err = service
            .brew(&BrewRequest::new(vec![BrewStep::Calibration]))
            .await
            .unwrap_err();
        assert_eq!(err, ExecutorError::SensorUnavailable("output_temp"));
        // Refill restarts even after a failed brew.
        assert_eq!(starts.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn should_mix_until_within_tolerance_of_target() {
        // One reading per batch, interleaved with the PID samples the water
        // stage takes every 10 accumulated units. Converges on the target:
        // |49.8 - 50| < 0.5 with a flat slope against the previous batch.
        let readings = [
            Some(70.0),
            Some(60.0),
            Some(50.0),
            Some(49.9),
            Some(49.9),
            Some(49.8),
        ];
        let (_handle, mut service) =
            service_with(acking_device(), acking_device(), &readings, Some(85.0));
        service.pipeline.set_low(20.0);
        service.pipeline.set_high(80.0);

        service
            .brew(&BrewRequest::new(vec![BrewStep::Mix {
                target_temperature: 50.0,
            }]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn should_fail_step_when_device_never_acknowledges() {
        let mut moving = MockDevicePort::new();
        moving.expect_send().returning(|_| Ok(()));
        moving.expect_recv().returning(|| None);
        let extruder = MockDevicePort::new();

        let (_handle, mut service) = service_with(moving, extruder, &[], Some(80.0));
        let point = Point::move_point(1.0, 2.0, 3.0, 300.0);
        let err = service
            .brew(&BrewRequest::new(vec![BrewStep::Points(vec![point])]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutorError::DeviceTimeout { device: "moving", .. }
        ));
    }

    #[tokio::test]
    async fn should_abort_when_tank_temperature_is_unavailable() {
        let (_handle, mut service) =
            service_with(acking_device(), acking_device(), &[], None);

        let err = service
            .brew(&BrewRequest::new(vec![BrewStep::Home]))
            .await
            .unwrap_err();
        assert_eq!(err, ExecutorError::SensorUnavailable("tank_temp"));
    }

    #[tokio::test]
    async fn should_cancel_wait_step_via_stop_flag() {
        let (handle, mut service) =
            service_with(acking_device(), acking_device(), &[], Some(80.0));

        handle.stop();
        let err = service
            .brew(&BrewRequest::new(vec![BrewStep::Wait { seconds: 60 }]))
            .await
            .unwrap_err();
        assert_eq!(err, ExecutorError::Stopped);
    }
}
