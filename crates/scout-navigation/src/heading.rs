//! Single-axis heading estimator for the hardware path.
//!
//! The filter only predicts: it integrates the bias-corrected yaw rate and
//! grows its variances. There is no measurement update, so the bias stays at
//! its initial value until a caller resets it.

use scout_kinematics::normalize_degrees;

/// Filter tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HeadingParams {
    /// Heading process noise per second.
    pub q_heading: f64,
    /// Bias process noise per second.
    pub q_bias: f64,
    /// Initial variance of both states.
    pub p0: f64,
    /// Step used when the caller gives no dt (s).
    pub default_dt: f64,
}

impl Default for HeadingParams {
    fn default() -> Self {
        Self { q_heading: 0.01, q_bias: 0.0001, p0: 1.0, default_dt: 0.1 }
    }
}

/// Heading (degrees, `[0, 360)`, clockwise) and gyro-bias estimate.
#[derive(Debug, Clone)]
pub struct HeadingEstimator {
    params: HeadingParams,
    heading_deg: f64,
    bias: f64,
    p_heading: f64,
    p_bias: f64,
}

impl Default for HeadingEstimator {
    fn default() -> Self {
        Self::new(HeadingParams::default())
    }
}

impl HeadingEstimator {
    /// Estimator at heading 0 with zero bias.
    pub fn new(params: HeadingParams) -> Self {
        Self {
            params,
            heading_deg: 0.0,
            bias: 0.0,
            p_heading: params.p0,
            p_bias: params.p0,
        }
    }

    /// Integrates a yaw rate (deg/s) over `dt` seconds and returns the new heading.
    pub fn update(&mut self, rate_dps: f64, dt: Option<f64>) -> f64 {
        let dt = dt.unwrap_or(self.params.default_dt);
        self.heading_deg = normalize_degrees(self.heading_deg + (rate_dps - self.bias) * dt);
        self.p_heading += self.params.q_heading * dt;
        self.p_bias += self.params.q_bias * dt;
        self.heading_deg
    }

    /// Current heading (degrees).
    pub fn heading_deg(&self) -> f64 {
        self.heading_deg
    }

    /// Gyro bias estimate (deg/s).
    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Heading variance.
    pub fn heading_variance(&self) -> f64 {
        self.p_heading
    }

    /// Bias variance.
    pub fn bias_variance(&self) -> f64 {
        self.p_bias
    }

    /// Restores the initial state at `heading_deg`.
    pub fn reset(&mut self, heading_deg: f64) {
        *self = Self { heading_deg: normalize_degrees(heading_deg), ..Self::new(self.params) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_integrates_rate() {
        let mut h = HeadingEstimator::default();
        assert!((h.update(10.0, Some(0.5)) - 5.0).abs() < EPSILON);
        // Default dt is 0.1 s.
        assert!((h.update(10.0, None) - 6.0).abs() < EPSILON);
    }

    #[test]
    fn test_wraps_into_range() {
        let mut h = HeadingEstimator::default();
        assert!((h.update(-30.0, Some(1.0)) - 330.0).abs() < EPSILON);
        assert!((h.update(60.0, Some(1.0)) - 30.0).abs() < EPSILON);
        for _ in 0..500 {
            let heading = h.update(123.4, Some(0.37));
            assert!((0.0..360.0).contains(&heading));
        }
    }

    #[test]
    fn test_variance_grows() {
        let mut h = HeadingEstimator::default();
        h.update(0.0, Some(2.0));
        assert!((h.heading_variance() - 1.02).abs() < EPSILON);
        assert!((h.bias_variance() - 1.0002).abs() < EPSILON);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut h = HeadingEstimator::default();
        h.update(90.0, Some(1.0));
        h.reset(370.0);
        assert!((h.heading_deg() - 10.0).abs() < EPSILON);
        assert_eq!(h.bias(), 0.0);
        assert_eq!(h.heading_variance(), 1.0);
        assert_eq!(h.bias_variance(), 1.0);
    }
}
