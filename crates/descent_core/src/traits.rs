use crate::error::EvaluationError;

/// A real-valued function of a fixed number of variables.
///
/// Implemented by compiled expressions; tests implement it directly for
/// closed-form functions.
pub trait Objective {
    /// Returns the number of input variables (1 or 2 for the visualizer).
    fn dimension(&self) -> usize;

    /// Evaluates the function at `point`.
    /// `point.len()` must equal `dimension()`.
    fn evaluate(&self, point: &[f64]) -> Result<f64, EvaluationError>;
}

impl<F: Objective + ?Sized> Objective for &F {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn evaluate(&self, point: &[f64]) -> Result<f64, EvaluationError> {
        (**self).evaluate(point)
    }
}
