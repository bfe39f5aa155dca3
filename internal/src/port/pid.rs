/// Stateful control-loop primitive.
#[cfg_attr(test, mockall::automock)]
pub trait PidPort {
    /// Correction in percentage points for the given measured/target pair,
    /// `dt` being the seconds elapsed since the previous sample.
    fn correction(&mut self, measured: f64, target: f64, dt: f64) -> f64;

    /// Clears the accumulated error history.
    fn reset(&mut self);
}
