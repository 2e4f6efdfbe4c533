//! Function samples for drawing the curve or surface under a trajectory.

use crate::traits::Objective;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub min: f64,
    pub max: f64,
    pub samples: usize,
}

impl AxisSpec {
    fn validate(&self, name: &str) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.max <= self.min {
            bail!("The {name} axis range must be finite with max > min.");
        }
        if self.samples < 2 {
            bail!("The {name} axis needs at least 2 samples.");
        }
        Ok(())
    }

    fn coordinates(&self) -> Vec<f64> {
        let step = (self.max - self.min) / (self.samples - 1) as f64;
        (0..self.samples)
            .map(|i| self.min + step * i as f64)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSamples {
    pub xs: Vec<f64>,
    /// `NaN` where the function could not be evaluated.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSamples {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    /// Row-major: `values[j * xs.len() + i] = f(xs[i], ys[j])`, `NaN` on failure.
    pub values: Vec<f64>,
}

pub fn sample_curve<F: Objective + ?Sized>(f: &F, axis: &AxisSpec) -> Result<CurveSamples> {
    if f.dimension() != 1 {
        bail!("Curve sampling needs a function of one variable.");
    }
    axis.validate("x")?;
    let xs = axis.coordinates();
    let values = xs
        .iter()
        .map(|&x| f.evaluate(&[x]).unwrap_or(f64::NAN))
        .collect();
    Ok(CurveSamples { xs, values })
}

pub fn sample_surface<F: Objective + ?Sized>(
    f: &F,
    x_axis: &AxisSpec,
    y_axis: &AxisSpec,
) -> Result<SurfaceSamples> {
    if f.dimension() != 2 {
        bail!("Surface sampling needs a function of two variables.");
    }
    x_axis.validate("x")?;
    y_axis.validate("y")?;
    let xs = x_axis.coordinates();
    let ys = y_axis.coordinates();
    let mut values = Vec::with_capacity(xs.len() * ys.len());
    for &y in &ys {
        for &x in &xs {
            values.push(f.evaluate(&[x, y]).unwrap_or(f64::NAN));
        }
    }
    Ok(SurfaceSamples { xs, ys, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::equation_engine::compile;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn curve_samples_mark_failures_with_nan() {
        let f = compile("1 / x", Mode::Curve).expect("compiles");
        let axis = AxisSpec {
            min: -1.0,
            max: 1.0,
            samples: 5,
        };
        let curve = sample_curve(&f, &axis).expect("samples");
        assert_eq!(curve.xs, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert_eq!(curve.values[0], -1.0);
        assert!(curve.values[2].is_nan());
        assert_eq!(curve.values[4], 1.0);
    }

    #[test]
    fn surface_samples_are_row_major() {
        let f = compile("x + 10 * y", Mode::Surface).expect("compiles");
        let x_axis = AxisSpec {
            min: 0.0,
            max: 2.0,
            samples: 3,
        };
        let y_axis = AxisSpec {
            min: 0.0,
            max: 1.0,
            samples: 2,
        };
        let surface = sample_surface(&f, &x_axis, &y_axis).expect("samples");
        assert_eq!(surface.values, vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn rejects_invalid_axes_and_dimensions() {
        let curve = compile("x", Mode::Curve).expect("compiles");
        let surface = compile("x * y", Mode::Surface).expect("compiles");
        let good = AxisSpec {
            min: 0.0,
            max: 1.0,
            samples: 2,
        };
        assert_err_contains(
            sample_curve(
                &curve,
                &AxisSpec {
                    min: 1.0,
                    max: 1.0,
                    samples: 4,
                },
            ),
            "max > min",
        );
        assert_err_contains(
            sample_curve(
                &curve,
                &AxisSpec {
                    min: 0.0,
                    max: 1.0,
                    samples: 1,
                },
            ),
            "at least 2 samples",
        );
        assert_err_contains(sample_curve(&surface, &good), "one variable");
        assert_err_contains(sample_surface(&curve, &good, &good), "two variables");
    }
}
