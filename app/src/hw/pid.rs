use internal::port::pid::PidPort;

/// Software PID producing a mix-ratio correction in percentage points from
/// the measured-vs-target temperature error. The integral term is clamped
/// to avoid windup while the output settles.
#[derive(Debug, Clone)]
pub struct Pid {
    kp: f64,
    ki: f64,
    kd: f64,
    integral: f64,
    last_error: Option<f64>,
    integral_limit: f64,
}

impl Pid {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Pid {
            kp,
            ki,
            kd,
            integral: 0.0,
            last_error: None,
            integral_limit: 100.0,
        }
    }

    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = limit;
        self
    }
}

impl PidPort for Pid {
    fn correction(&mut self, measured: f64, target: f64, dt: f64) -> f64 {
        let error = target - measured;

        if dt > 0.0 {
            self.integral =
                (self.integral + error * dt).clamp(-self.integral_limit, self.integral_limit);
        }
        let derivative = match self.last_error {
            Some(previous) if dt > 0.0 => (error - previous) / dt,
            _ => 0.0,
        };
        self.last_error = Some(error);

        self.kp * error + self.ki * self.integral + self.kd * derivative
    }

    fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = None;
    }
}
