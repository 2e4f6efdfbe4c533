//! Random starting points drawn from a fixed grid.

use crate::config::{Mode, START_VALUE_BOUND};
use crate::error::SampleError;
use crate::traits::Objective;
use log::debug;
use rand::Rng;

/// A one-dimensional grid `min, min + step, ..., max`, generated from integer
/// indices so that points such as `0.0` are hit exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridAxis {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl GridAxis {
    pub fn points(self) -> impl Iterator<Item = f64> {
        let count = ((self.max - self.min) / self.step).round() as usize + 1;
        (0..count).map(move |i| self.min + self.step * i as f64)
    }
}

/// The sampling grid for a mode: `[-10, 10]` in 2D, `[-5, 5]^2` in 3D, step `0.5`.
pub fn grid_for_mode(mode: Mode) -> GridAxis {
    match mode {
        Mode::Curve => GridAxis {
            min: -10.0,
            max: 10.0,
            step: 0.5,
        },
        Mode::Surface => GridAxis {
            min: -5.0,
            max: 5.0,
            step: 0.5,
        },
    }
}

/// Every grid point where `f` evaluates to a finite value with `|f| < 100`.
pub fn valid_starting_points<F: Objective + ?Sized>(f: &F, mode: Mode) -> Vec<Vec<f64>> {
    let axis = grid_for_mode(mode);
    let candidates: Vec<Vec<f64>> = match mode {
        Mode::Curve => axis.points().map(|x| vec![x]).collect(),
        Mode::Surface => axis
            .points()
            .flat_map(move |x| axis.points().map(move |y| vec![x, y]))
            .collect(),
    };

    candidates
        .into_iter()
        .filter(|point| match f.evaluate(point) {
            Ok(value) => value.is_finite() && value.abs() < START_VALUE_BOUND,
            Err(_) => false,
        })
        .collect()
}

/// Picks one valid grid point uniformly at random.
pub fn sample_starting_point<F, R>(f: &F, mode: Mode, rng: &mut R) -> Result<Vec<f64>, SampleError>
where
    F: Objective + ?Sized,
    R: Rng + ?Sized,
{
    let mut valid = valid_starting_points(f, mode);
    if valid.is_empty() {
        debug!("no valid starting point on the {mode} grid");
        return Err(SampleError::NoValidPoint);
    }
    let index = rng.gen_range(0..valid.len());
    debug!(
        "sampled starting point {:?} from {} candidates",
        valid[index],
        valid.len()
    );
    Ok(valid.swap_remove(index))
}
