use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Finite-difference step used by the differentiator.
pub const FINITE_DIFFERENCE_STEP: f64 = 1e-4;
/// Largest coordinate magnitude a descent may reach before it is declared diverged.
pub const POSITION_BOUND: f64 = 10.0;
/// Largest function value magnitude a descent may record before it is declared diverged.
pub const VALUE_BOUND: f64 = 100.0;
/// Starting points must evaluate strictly below this magnitude.
pub const START_VALUE_BOUND: f64 = 100.0;
pub const MAX_ITERATIONS_LIMIT: usize = 100;

/// Plot mode: a curve `f(x)` or a surface `f(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Mode {
    #[default]
    #[serde(rename = "2d")]
    Curve,
    #[serde(rename = "3d")]
    Surface,
}

impl Mode {
    /// Variable names in evaluation order.
    pub fn variables(self) -> &'static [&'static str] {
        match self {
            Mode::Curve => &["x"],
            Mode::Surface => &["x", "y"],
        }
    }

    pub fn dimension(self) -> usize {
        self.variables().len()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Curve => f.write_str("2D"),
            Mode::Surface => f.write_str("3D"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "2d" | "curve" => Ok(Mode::Curve),
            "3d" | "surface" => Ok(Mode::Surface),
            other => Err(format!("Unknown mode: {other}")),
        }
    }
}

/// Parameters of a single descent run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub learning_rate: f64,
    pub max_iterations: usize,
    pub mode: Mode,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iterations: 50,
            mode: Mode::Curve,
        }
    }
}

impl Configuration {
    pub fn new(learning_rate: f64, max_iterations: usize, mode: Mode) -> Self {
        Self {
            learning_rate,
            max_iterations,
            mode,
        }
    }

    /// Rejects out-of-range values. Values are never clamped.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let lr = self.learning_rate;
        if !lr.is_finite() || lr <= 0.0 || lr >= 1.0 {
            return Err(ValidationError::OutOfRange {
                field: "learning_rate",
                value: lr,
                expected: "0 < learning_rate < 1",
            });
        }
        if self.max_iterations < 1 || self.max_iterations > MAX_ITERATIONS_LIMIT {
            return Err(ValidationError::OutOfRange {
                field: "max_iterations",
                value: self.max_iterations as f64,
                expected: "1 <= max_iterations <= 100",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// Minimum time between two playback ticks, in milliseconds.
    pub interval_ms: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self { interval_ms: 300.0 }
    }
}

impl PlaybackSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.interval_ms.is_finite() || self.interval_ms <= 0.0 {
            return Err(ValidationError::OutOfRange {
                field: "interval_ms",
                value: self.interval_ms,
                expected: "interval_ms > 0",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_is_valid() {
        assert!(Configuration::default().validate().is_ok());
        assert!(PlaybackSettings::default().validate().is_ok());
    }

    #[test]
    fn learning_rate_bounds_are_exclusive() {
        for lr in [0.0, 1.0, -0.5, 1.5, f64::NAN, f64::INFINITY] {
            let config = Configuration::new(lr, 10, Mode::Curve);
            let err = config.validate().expect_err("learning rate should be rejected");
            assert!(matches!(
                err,
                ValidationError::OutOfRange {
                    field: "learning_rate",
                    ..
                }
            ));
        }
        assert!(Configuration::new(0.999, 10, Mode::Curve).validate().is_ok());
    }

    #[test]
    fn iteration_bounds_are_inclusive() {
        assert!(Configuration::new(0.1, 1, Mode::Curve).validate().is_ok());
        assert!(Configuration::new(0.1, 100, Mode::Surface).validate().is_ok());
        for iterations in [0, 101] {
            let err = Configuration::new(0.1, iterations, Mode::Curve)
                .validate()
                .expect_err("iterations should be rejected");
            assert!(matches!(
                err,
                ValidationError::OutOfRange {
                    field: "max_iterations",
                    ..
                }
            ));
        }
    }

    #[test]
    fn mode_parses_aliases() {
        assert_eq!("2D".parse::<Mode>(), Ok(Mode::Curve));
        assert_eq!(" surface ".parse::<Mode>(), Ok(Mode::Surface));
        assert!("4d".parse::<Mode>().is_err());
        assert_eq!(Mode::Surface.variables(), &["x", "y"]);
    }

    #[test]
    fn playback_interval_must_be_positive() {
        assert!(PlaybackSettings { interval_ms: 0.0 }.validate().is_err());
        assert!(PlaybackSettings { interval_ms: f64::NAN }.validate().is_err());
    }
}
