//! The session object: current function, latest run, cursor and playback.
//!
//! Every operation that replaces or aborts a run bumps the session
//! generation. Playback ticks carry the generation they were issued for, so a
//! tick scheduled against an old trajectory is ignored instead of reading the
//! new one.

use crate::config::{Configuration, Mode, PlaybackSettings};
use crate::descent::{run_descent, DescentOutcome, Termination};
use crate::equation_engine::{compile, CompiledFunction};
use crate::error::{CompileError, DescentError, ValidationError};
use crate::playback::Playback;
use crate::sampler::sample_starting_point;
use crate::trajectory::{Advance, PlaybackCursor, Step, Trajectory};
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::sync::Arc;

/// An immutable record of one completed or diverged run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub generation: u64,
    pub expression: String,
    pub config: Configuration,
    pub start: Vec<f64>,
    pub outcome: DescentOutcome,
}

impl RunRecord {
    pub fn trajectory(&self) -> &Trajectory {
        &self.outcome.trajectory
    }

    pub fn termination(&self) -> &Termination {
        &self.outcome.termination
    }
}

/// Identifies the run a playback activity was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackToken {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The token belongs to a replaced or aborted run.
    Stale,
    /// Playback is not running.
    Inactive,
    /// Not enough time has passed since the previous tick.
    Waiting,
    Advanced(usize),
    /// The cursor reached the last step; playback has stopped.
    Finished(usize),
}

pub struct Session {
    config: Configuration,
    function: Option<CompiledFunction>,
    run: Option<Arc<RunRecord>>,
    cursor: Option<PlaybackCursor>,
    playback: Playback,
    generation: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            config: Configuration::default(),
            function: None,
            run: None,
            cursor: None,
            playback: Playback::default(),
            generation: 0,
        }
    }
}

impl Session {
    pub fn new(config: Configuration, playback: PlaybackSettings) -> Result<Self, ValidationError> {
        config.validate()?;
        playback.validate()?;
        Ok(Self {
            config,
            playback: Playback::new(playback),
            ..Self::default()
        })
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn function(&self) -> Option<&CompiledFunction> {
        self.function.as_ref()
    }

    /// The latest run. The returned handle stays valid after the session
    /// moves on, which keeps exports stable while a new run replaces this one.
    pub fn run(&self) -> Option<&Arc<RunRecord>> {
        self.run.as_ref()
    }

    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.run.as_deref().map(RunRecord::trajectory)
    }

    /// Discards the current run, its cursor and any playback.
    pub fn abort(&mut self) {
        self.generation += 1;
        if self.run.take().is_some() {
            debug!("session run discarded (generation {})", self.generation);
        }
        self.cursor = None;
        self.playback.cancel();
    }

    /// Compiles `text` for the current mode. The previous run is discarded
    /// whether or not compilation succeeds.
    pub fn set_expression(&mut self, text: &str) -> Result<(), CompileError> {
        self.abort();
        match compile(text, self.config.mode) {
            Ok(function) => {
                self.function = Some(function);
                Ok(())
            }
            Err(err) => {
                self.function = None;
                Err(err)
            }
        }
    }

    /// Switches between curve and surface mode, dropping the compiled function.
    pub fn set_mode(&mut self, mode: Mode) {
        self.abort();
        self.function = None;
        self.config.mode = mode;
    }

    /// Replaces the configuration. Any change, valid or not, aborts the current run.
    pub fn configure(&mut self, config: Configuration) -> Result<(), ValidationError> {
        self.abort();
        config.validate()?;
        if config.mode != self.config.mode {
            self.function = None;
        }
        self.config = config;
        Ok(())
    }

    /// Samples a random starting point and runs a full descent.
    pub fn start_run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&RunRecord, DescentError> {
        self.abort();
        self.config.validate()?;
        let function = self.function.as_ref().ok_or(DescentError::NoFunction)?;
        let start = sample_starting_point(function, self.config.mode, rng)?;
        self.start_run_at(start)
    }

    /// [`Session::start_run`] with a reproducible random source.
    pub fn start_run_with_seed(&mut self, seed: u64) -> Result<&RunRecord, DescentError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.start_run(&mut rng)
    }

    /// Runs a full descent from a caller-chosen starting point.
    pub fn start_run_at(&mut self, start: Vec<f64>) -> Result<&RunRecord, DescentError> {
        self.abort();
        self.config.validate()?;
        let function = self.function.clone().ok_or(DescentError::NoFunction)?;
        let expression = function.source().to_string();
        let outcome = run_descent(function, start.clone(), &self.config)?;
        debug!(
            "run {} finished with {} steps: {:?}",
            self.generation,
            outcome.trajectory.len(),
            outcome.termination
        );

        let record = Arc::new(RunRecord {
            generation: self.generation,
            expression,
            config: self.config,
            start,
            outcome,
        });
        self.cursor = PlaybackCursor::new(record.trajectory());
        let record: &RunRecord = self.run.insert(record);
        Ok(record)
    }

    /// Index of the displayed step, if the current run recorded any.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor.map(|c| c.position())
    }

    pub fn current_step(&self) -> Option<&Step> {
        let index = self.cursor()?;
        self.trajectory()?.step_at(index).ok()
    }

    /// Manual stepping; stops any playback first.
    pub fn step_forward(&mut self) -> Result<Advance, DescentError> {
        self.playback.cancel();
        let cursor = self.cursor.as_mut().ok_or(DescentError::NoRun)?;
        Ok(cursor.advance())
    }

    /// Direct selection, e.g. from a click on a log line. Playback is unaffected.
    pub fn jump_to(&mut self, index: usize) -> Result<&Step, DescentError> {
        let cursor = self.cursor.as_mut().ok_or(DescentError::NoRun)?;
        cursor.jump_to(index)?;
        let trajectory = self.trajectory().ok_or(DescentError::NoRun)?;
        Ok(trajectory.step_at(index)?)
    }

    /// Starts playback at `now`, rewinding to the first step if the cursor
    /// is already at the end.
    pub fn play(&mut self, now: f64) -> Result<PlaybackToken, DescentError> {
        let cursor = self.cursor.as_mut().ok_or(DescentError::NoRun)?;
        if cursor.is_at_end() {
            cursor.reset();
        }
        self.playback.start(now);
        Ok(PlaybackToken {
            generation: self.generation,
        })
    }

    pub fn pause(&mut self) {
        self.playback.cancel();
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_active()
    }

    /// Advances playback if a tick is due at `now`.
    pub fn tick(&mut self, token: PlaybackToken, now: f64) -> TickOutcome {
        if token.generation != self.generation {
            return TickOutcome::Stale;
        }
        if !self.playback.is_active() {
            return TickOutcome::Inactive;
        }
        let Some(cursor) = self.cursor.as_mut() else {
            self.playback.cancel();
            return TickOutcome::Inactive;
        };
        if !self.playback.poll(now) {
            return TickOutcome::Waiting;
        }
        match cursor.advance() {
            Advance::Moved(index) if !cursor.is_at_end() => TickOutcome::Advanced(index),
            Advance::Moved(index) => {
                self.playback.cancel();
                TickOutcome::Finished(index)
            }
            Advance::AtEnd => {
                self.playback.cancel();
                TickOutcome::Finished(cursor.position())
            }
        }
    }
}
