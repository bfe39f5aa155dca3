/// Calibrated temperature endpoints reached by pure flow from each source.
///
/// `low` is the pure source-1 temperature, `high` the pure source-2 one.
/// Both bounds must be present before a brew may extrude.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TemperatureRange {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl TemperatureRange {
    pub fn is_complete(&self) -> bool {
        self.low.is_some() && self.high.is_some()
    }

    /// Linear interpolation of `target` against the calibrated bounds.
    ///
    /// Returns `None` until both bounds are known. The result is not clamped;
    /// clamping happens after the PID correction is applied.
    pub fn percentage_for(&self, target: f64) -> Option<f64> {
        let (low, high) = (self.low?, self.high?);
        Some((target - low) / (high - low))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_interpolate_target_between_bounds() {
        let range = TemperatureRange {
            low: Some(20.0),
            high: Some(80.0),
        };
        assert_eq!(range.percentage_for(50.0), Some(0.5));
        assert_eq!(range.percentage_for(20.0), Some(0.0));
        assert_eq!(range.percentage_for(80.0), Some(1.0));
    }

    #[test]
    fn should_not_interpolate_with_missing_bound() {
        let range = TemperatureRange {
            low: Some(20.0),
            high: None,
        };
        assert_eq!(range.percentage_for(50.0), None);
        assert!(!range.is_complete());
    }
}
