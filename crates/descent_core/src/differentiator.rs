use crate::config::FINITE_DIFFERENCE_STEP;
use crate::error::EvaluationError;
use crate::traits::Objective;

/// Forward-difference gradient of `f` at `point` with the default step `1e-4`.
pub fn gradient<F: Objective + ?Sized>(f: &F, point: &[f64]) -> Result<Vec<f64>, EvaluationError> {
    gradient_with_step(f, point, FINITE_DIFFERENCE_STEP)
}

/// Forward-difference gradient: `(f(p + h e_i) - f(p)) / h` for each coordinate.
///
/// Any failed evaluation or non-finite quotient fails the whole estimate, in
/// one and two dimensions alike.
pub fn gradient_with_step<F: Objective + ?Sized>(
    f: &F,
    point: &[f64],
    h: f64,
) -> Result<Vec<f64>, EvaluationError> {
    let base = f.evaluate(point)?;
    let mut shifted = point.to_vec();
    let mut grad = Vec::with_capacity(point.len());

    for i in 0..point.len() {
        shifted[i] = point[i] + h;
        let value = f.evaluate(&shifted)?;
        shifted[i] = point[i];

        let partial = (value - base) / h;
        if !partial.is_finite() {
            return Err(EvaluationError::NonFinite);
        }
        grad.push(partial);
    }

    Ok(grad)
}
