pub mod config;
pub mod descent;
pub mod differentiator;
pub mod equation_engine;
pub mod error;
pub mod playback;
pub mod plot;
pub mod report;
pub mod sampler;
pub mod session;
/// The `descent_core` crate is the numerical engine behind the gradient
/// descent visualizer. It turns a user formula into a safe evaluable
/// function and produces a deterministic, replayable trajectory that the
/// rendering, logging and export layers consume step by step.
///
/// Key components:
/// - **Equation Engine**: tokenizer, parser and bytecode VM for user formulas in `x` or `x, y`.
/// - **Differentiator**: forward finite-difference gradients.
/// - **Sampler**: random starting points on a fixed grid.
/// - **Descent**: the bounded descent state machine with divergence guards.
/// - **Trajectory / Playback / Session**: replay, cursor and cancellable playback.
pub mod traits;
pub mod trajectory;

pub use config::{Configuration, Mode, PlaybackSettings};
pub use descent::{run_descent, DescentEngine, DescentOutcome, EngineState, Termination};
pub use equation_engine::{compile, CompiledFunction};
pub use error::{CompileError, DescentError, EvaluationError, IndexError, SampleError, ValidationError};
pub use session::{PlaybackToken, RunRecord, Session, TickOutcome};
pub use traits::Objective;
pub use trajectory::{Advance, PlaybackCursor, Step, Trajectory};
