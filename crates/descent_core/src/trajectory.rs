//! Recorded descent steps and random-access replay.

use crate::error::IndexError;
use serde::{Deserialize, Serialize};

/// A single recorded optimization step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub index: usize,
    /// `[x]` in 2D, `[x, y]` in 3D.
    pub position: Vec<f64>,
    pub value: f64,
    /// One partial derivative per coordinate.
    pub gradient: Vec<f64>,
}

/// Ordered, contiguous sequence of steps.
///
/// Only the descent engine appends to a trajectory; everyone else gets a
/// read-only view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trajectory {
    steps: Vec<Step>,
}

impl Trajectory {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            steps: Vec::with_capacity(capacity),
        }
    }

    /// Appends a step built from the next index.
    pub(crate) fn record(&mut self, position: Vec<f64>, value: f64, gradient: Vec<f64>) -> &Step {
        let index = self.steps.len();
        self.steps.push(Step {
            index,
            position,
            value,
            gradient,
        });
        &self.steps[index]
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_at(&self, index: usize) -> Result<&Step, IndexError> {
        self.steps.get(index).ok_or(IndexError {
            index,
            len: self.steps.len(),
        })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }

    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// Result of trying to move the cursor forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(usize),
    AtEnd,
}

/// Index of the step currently displayed, bounded by a trajectory length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackCursor {
    position: usize,
    len: usize,
}

impl PlaybackCursor {
    /// A cursor at step 0. Returns `None` for an empty trajectory, which has
    /// no displayable step.
    pub fn new(trajectory: &Trajectory) -> Option<Self> {
        if trajectory.is_empty() {
            None
        } else {
            Some(Self {
                position: 0,
                len: trajectory.len(),
            })
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.position + 1 >= self.len
    }

    /// Moves forward by one step; reports `AtEnd` without moving on the last step.
    pub fn advance(&mut self) -> Advance {
        if self.is_at_end() {
            Advance::AtEnd
        } else {
            self.position += 1;
            Advance::Moved(self.position)
        }
    }

    pub fn jump_to(&mut self, index: usize) -> Result<usize, IndexError> {
        if index >= self.len {
            return Err(IndexError {
                index,
                len: self.len,
            });
        }
        self.position = index;
        Ok(index)
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }
}
