//! Gradient descent as an explicit state machine.
//!
//! `Idle -> Running -> {Completed, Diverged, Aborted}`. An abort drops the
//! run and leaves the engine back in `Idle`. Each call to [`DescentEngine::step`] records at most one step, so a
//! host can drive the engine cooperatively or call [`DescentEngine::run`] to
//! finish eagerly (bounded by `max_iterations <= 100`).

use crate::config::{Configuration, POSITION_BOUND, VALUE_BOUND};
use crate::differentiator::gradient;
use crate::error::{DescentError, EvaluationError, ValidationError};
use crate::traits::Objective;
use crate::trajectory::{Step, Trajectory};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    Running,
    Completed,
    Diverged,
    Aborted,
}

impl EngineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, EngineState::Completed | EngineState::Diverged)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DivergenceReason {
    /// The function or its gradient could not be evaluated at the current position.
    Evaluation { error: EvaluationError },
    /// The update moved a coordinate beyond the plot range.
    PositionOutOfBounds,
    /// The recorded value left the plot range.
    ValueOutOfBounds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Termination {
    Completed,
    Diverged(DivergenceReason),
}

impl Termination {
    pub fn state(&self) -> EngineState {
        match self {
            Termination::Completed => EngineState::Completed,
            Termination::Diverged(_) => EngineState::Diverged,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Completed => f.write_str("completed"),
            Termination::Diverged(DivergenceReason::Evaluation { error }) => {
                write!(f, "diverged ({error})")
            }
            Termination::Diverged(DivergenceReason::PositionOutOfBounds) => {
                f.write_str("diverged (position left the plot range)")
            }
            Termination::Diverged(DivergenceReason::ValueOutOfBounds) => {
                f.write_str("diverged (value left the plot range)")
            }
        }
    }
}

/// A finished run: the recorded steps and why recording stopped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescentOutcome {
    pub trajectory: Trajectory,
    pub termination: Termination,
}

struct ActiveRun<F> {
    function: F,
    learning_rate: f64,
    max_iterations: usize,
    position: Vec<f64>,
    trajectory: Trajectory,
    termination: Option<Termination>,
}

impl<F: Objective> ActiveRun<F> {
    /// Evaluates, records, updates and checks the guards. Returns the
    /// termination if this call ended the run.
    fn advance(&mut self) -> Option<Termination> {
        let value = match self.function.evaluate(&self.position) {
            Ok(value) if value.is_finite() => value,
            Ok(_) => return Some(diverged_on(EvaluationError::NonFinite)),
            Err(error) => return Some(diverged_on(error)),
        };
        let grad = match gradient(&self.function, &self.position) {
            Ok(grad) => grad,
            Err(error) => return Some(diverged_on(error)),
        };

        let next: Vec<f64> = self
            .position
            .iter()
            .zip(&grad)
            .map(|(x, g)| x - self.learning_rate * g)
            .collect();
        let position = std::mem::replace(&mut self.position, next);
        let step = self.trajectory.record(position, value, grad);
        trace!(
            "step {}: position {:?}, value {}, gradient {:?}",
            step.index,
            step.position,
            step.value,
            step.gradient
        );

        if self.position.iter().any(|c| c.abs() > POSITION_BOUND) {
            return Some(Termination::Diverged(DivergenceReason::PositionOutOfBounds));
        }
        if value.abs() > VALUE_BOUND {
            return Some(Termination::Diverged(DivergenceReason::ValueOutOfBounds));
        }
        if self.trajectory.len() >= self.max_iterations {
            return Some(Termination::Completed);
        }
        None
    }
}

fn diverged_on(error: EvaluationError) -> Termination {
    Termination::Diverged(DivergenceReason::Evaluation { error })
}

pub struct DescentEngine<F> {
    state: EngineState,
    run: Option<ActiveRun<F>>,
}

impl<F: Objective> Default for DescentEngine<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Objective> DescentEngine<F> {
    pub fn new() -> Self {
        Self {
            state: EngineState::Idle,
            run: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Begins a run from `start`. Any previous run is discarded first.
    pub fn start(
        &mut self,
        function: F,
        start: Vec<f64>,
        config: &Configuration,
    ) -> Result<(), DescentError> {
        config.validate()?;
        if start.len() != function.dimension() {
            return Err(ValidationError::OutOfRange {
                field: "start",
                value: start.len() as f64,
                expected: "one coordinate per variable",
            }
            .into());
        }
        if self.run.is_some() {
            self.abort();
        }

        debug!(
            "starting descent at {:?} (learning rate {}, max iterations {})",
            start, config.learning_rate, config.max_iterations
        );
        self.run = Some(ActiveRun {
            function,
            learning_rate: config.learning_rate,
            max_iterations: config.max_iterations,
            position: start,
            trajectory: Trajectory::with_capacity(config.max_iterations),
            termination: None,
        });
        self.state = EngineState::Running;
        Ok(())
    }

    /// Generates one step. Returns the step recorded by this call, or `None`
    /// if the engine is not running or the run ended without recording.
    pub fn step(&mut self) -> Option<&Step> {
        if self.state != EngineState::Running {
            return None;
        }
        let run = self.run.as_mut()?;
        let before = run.trajectory.len();

        if let Some(termination) = run.advance() {
            match &termination {
                Termination::Completed => {
                    debug!("descent completed after {} steps", run.trajectory.len())
                }
                Termination::Diverged(reason) => warn!(
                    "descent diverged after {} steps: {:?}",
                    run.trajectory.len(),
                    reason
                ),
            }
            self.state = termination.state();
            run.termination = Some(termination);
        }

        if run.trajectory.len() > before {
            run.trajectory.last()
        } else {
            None
        }
    }

    /// Steps until the run reaches a terminal state.
    pub fn run(&mut self) -> EngineState {
        while self.state == EngineState::Running {
            self.step();
        }
        self.state
    }

    /// Drops the current run and its trajectory and returns the engine to
    /// `Idle`. Returns `Aborted` if a run was discarded, `Idle` otherwise.
    pub fn abort(&mut self) -> EngineState {
        self.state = EngineState::Idle;
        if self.run.take().is_some() {
            debug!("descent aborted");
            EngineState::Aborted
        } else {
            EngineState::Idle
        }
    }

    /// The steps recorded so far, including those of an unfinished run.
    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.run.as_ref().map(|run| &run.trajectory)
    }

    pub fn termination(&self) -> Option<&Termination> {
        self.run.as_ref().and_then(|run| run.termination.as_ref())
    }

    /// Consumes a finished engine. Returns `None` unless the run is terminal.
    pub fn finish(self) -> Option<DescentOutcome> {
        let run = self.run?;
        let termination = run.termination?;
        Some(DescentOutcome {
            trajectory: run.trajectory,
            termination,
        })
    }
}

/// Runs a complete descent from `start` and returns the outcome.
pub fn run_descent<F: Objective>(
    function: F,
    start: Vec<f64>,
    config: &Configuration,
) -> Result<DescentOutcome, DescentError> {
    let mut engine = DescentEngine::new();
    engine.start(function, start, config)?;
    engine.run();
    engine.finish().ok_or(DescentError::NoRun)
}
