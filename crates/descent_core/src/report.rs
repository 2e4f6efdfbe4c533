//! Human-readable log lines and the exportable run report.

use crate::config::Mode;
use crate::descent::Termination;
use crate::session::RunRecord;
use crate::trajectory::Step;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fmt;

/// One line of the step log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub index: usize,
    pub position: Vec<f64>,
    pub value: f64,
    pub gradient: Vec<f64>,
    /// The update applied after this step: `-learning_rate * gradient`.
    pub delta: Vec<f64>,
}

impl LogEntry {
    pub fn from_step(step: &Step, learning_rate: f64) -> Self {
        Self {
            index: step.index,
            position: step.position.clone(),
            value: step.value,
            gradient: step.gradient.clone(),
            delta: step.gradient.iter().map(|g| -learning_rate * g).collect(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.index + 1;
        match (
            self.position.as_slice(),
            self.gradient.as_slice(),
            self.delta.as_slice(),
        ) {
            ([x], [g], [dx]) => write!(
                f,
                "Step {label}: x = {x:.4}, f(x) = {:.4}, ∇f(x) = {g:.4}, Δx = {dx:.4}",
                self.value
            ),
            ([x, y], [gx, gy], _) => write!(
                f,
                "Step {label}: x = {x:.4}, y = {y:.4}, f(x,y) = {:.4}, ∇f = ({gx:.4}, {gy:.4})",
                self.value
            ),
            _ => write!(
                f,
                "Step {label}: position = {:?}, value = {:.4}",
                self.position, self.value
            ),
        }
    }
}

/// Everything an exporter needs to lay out a report document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub title: String,
    pub function: String,
    pub update_rule: String,
    pub parameters: Vec<(String, String)>,
    pub termination: Termination,
    pub final_position: Vec<f64>,
    pub final_value: f64,
    pub entries: Vec<LogEntry>,
}

impl RunReport {
    pub fn build(record: &RunRecord) -> Result<Self> {
        let trajectory = record.trajectory();
        if trajectory.is_empty() {
            bail!("Cannot build a report for a run without recorded steps.");
        }
        let last = trajectory
            .last()
            .context("Trajectory has no final step.")?;
        let learning_rate = record.config.learning_rate;

        let (function, update_rule) = match record.config.mode {
            Mode::Curve => (
                format!("f(x) = {}", record.expression),
                "x_next = x_current - (learning_rate * gradient)",
            ),
            Mode::Surface => (
                format!("f(x, y) = {}", record.expression),
                "(x, y)_next = (x, y)_current - (learning_rate * gradient)",
            ),
        };

        let parameters = vec![
            ("Learning Rate".to_string(), learning_rate.to_string()),
            (
                "Total Iterations".to_string(),
                record.config.max_iterations.to_string(),
            ),
            ("Mode".to_string(), record.config.mode.to_string()),
            (
                "Starting Point".to_string(),
                format_point(&record.start),
            ),
            ("Steps Recorded".to_string(), trajectory.len().to_string()),
        ];

        Ok(Self {
            title: "Gradient Descent Analysis".to_string(),
            function,
            update_rule: update_rule.to_string(),
            parameters,
            termination: record.termination().clone(),
            final_position: last.position.clone(),
            final_value: last.value,
            entries: trajectory
                .iter()
                .map(|step| LogEntry::from_step(step, learning_rate))
                .collect(),
        })
    }

    /// Plain-text rendering of the report.
    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

fn format_point(point: &[f64]) -> String {
    let coords: Vec<String> = point.iter().map(|c| format!("{c:.4}")).collect();
    format!("({})", coords.join(", "))
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", "=".repeat(self.title.chars().count()))?;
        writeln!(f)?;
        writeln!(f, "Optimization Problem")?;
        writeln!(f, "  Function: {}", self.function)?;
        writeln!(f, "  Update Rule: {}", self.update_rule)?;
        writeln!(f)?;
        writeln!(f, "Parameters")?;
        for (name, value) in &self.parameters {
            writeln!(f, "  {:<18}{}", format!("{name}:"), value)?;
        }
        writeln!(f)?;
        writeln!(f, "Optimization Progress")?;
        for entry in &self.entries {
            writeln!(f, "  {entry}")?;
        }
        writeln!(f)?;
        writeln!(f, "Outcome: {}", self.termination)?;
        write!(
            f,
            "Final point: {} with value {:.4}",
            format_point(&self.final_position),
            self.final_value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Configuration, PlaybackSettings};
    use crate::session::Session;

    fn recorded_session(mode: Mode, text: &str, start: Vec<f64>) -> Session {
        let config = Configuration::new(0.1, 3, mode);
        let mut session = Session::new(config, PlaybackSettings::default()).expect("valid");
        session.set_expression(text).expect("compiles");
        session.start_run_at(start).expect("runs");
        session
    }

    #[test]
    fn curve_log_line_matches_panel_format() {
        let step = Step {
            index: 2,
            position: vec![1.234],
            value: 1.5228,
            gradient: vec![2.4681],
        };
        let entry = LogEntry::from_step(&step, 0.1);
        assert_eq!(
            entry.to_string(),
            "Step 3: x = 1.2340, f(x) = 1.5228, ∇f(x) = 2.4681, Δx = -0.2468"
        );
    }

    #[test]
    fn surface_log_line_lists_both_partials() {
        let step = Step {
            index: 0,
            position: vec![1.0, -2.0],
            value: 5.0,
            gradient: vec![2.0001, -3.9999],
        };
        let entry = LogEntry::from_step(&step, 0.5);
        assert_eq!(entry.delta, vec![-1.00005, 1.99995]);
        assert_eq!(
            entry.to_string(),
            "Step 1: x = 1.0000, y = -2.0000, f(x,y) = 5.0000, ∇f = (2.0001, -3.9999)"
        );
    }

    #[test]
    fn hand_built_entry_without_delta_still_formats() {
        let entry = LogEntry {
            index: 0,
            position: vec![1.0],
            value: 1.0,
            gradient: vec![2.0],
            delta: Vec::new(),
        };
        assert_eq!(entry.to_string(), "Step 1: position = [1.0], value = 1.0000");
    }

    #[test]
    fn report_covers_every_step() {
        let session = recorded_session(Mode::Curve, "x^2", vec![2.0]);
        let report = RunReport::build(session.run().expect("run")).expect("report");
        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.function, "f(x) = x^2");
        assert_eq!(report.termination, Termination::Completed);

        let text = report.render_text();
        for heading in [
            "Gradient Descent Analysis",
            "Optimization Problem",
            "Parameters",
            "Optimization Progress",
        ] {
            assert!(text.contains(heading), "missing section {heading}");
        }
        assert!(text.contains("Step 1: x = 2.0000, f(x) = 4.0000"));
        assert!(text.contains("Starting Point:   (2.0000)"));
        assert!(text.contains("Outcome: completed"));
    }

    #[test]
    fn surface_report_names_both_variables() {
        let session = recorded_session(Mode::Surface, "x^2 + y^2", vec![1.0, 1.0]);
        let report = RunReport::build(session.run().expect("run")).expect("report");
        assert_eq!(report.function, "f(x, y) = x^2 + y^2");
        assert_eq!(report.final_position.len(), 2);
    }

    #[test]
    fn empty_run_has_no_report() {
        let session = recorded_session(Mode::Curve, "1 / x", vec![-1e-4]);
        let err = RunReport::build(session.run().expect("run")).expect_err("no steps");
        assert!(err.to_string().contains("without recorded steps"));
    }
}
