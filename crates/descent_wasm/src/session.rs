//! `WasmSession`: the JS-facing handle over a descent session.

use crate::{parse_mode, to_js_error};
use anyhow::{Context, Result};
use descent_core::plot::{sample_curve, sample_surface, AxisSpec};
use descent_core::report::{LogEntry, RunReport};
use descent_core::{
    Advance, Configuration, PlaybackSettings, PlaybackToken, RunRecord, Session, Step,
    TickOutcome,
};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmSession {
    session: Session,
    token: Option<PlaybackToken>,
}

#[wasm_bindgen]
impl WasmSession {
    #[wasm_bindgen(constructor)]
    pub fn new(mode: &str, interval_ms: f64) -> Result<WasmSession, JsValue> {
        console_error_panic_hook::set_once();

        let mode = parse_mode(mode).map_err(to_js_error)?;
        let config = Configuration {
            mode,
            ..Configuration::default()
        };
        let session =
            Session::new(config, PlaybackSettings { interval_ms }).map_err(to_js_error)?;
        Ok(WasmSession {
            session,
            token: None,
        })
    }

    pub fn mode(&self) -> String {
        self.session.mode().to_string()
    }

    pub fn set_expression(&mut self, text: &str) -> Result<(), JsValue> {
        self.token = None;
        self.session.set_expression(text).map_err(to_js_error)
    }

    pub fn set_mode(&mut self, mode: &str) -> Result<(), JsValue> {
        let mode = parse_mode(mode).map_err(to_js_error)?;
        self.token = None;
        self.session.set_mode(mode);
        Ok(())
    }

    pub fn configure(&mut self, learning_rate: f64, max_iterations: usize) -> Result<(), JsValue> {
        self.token = None;
        let config = Configuration::new(learning_rate, max_iterations, self.session.mode());
        self.session.configure(config).map_err(to_js_error)
    }

    /// Runs a descent from a random start. Returns the number of recorded steps.
    pub fn start(&mut self) -> Result<usize, JsValue> {
        let seed = (js_sys::Math::random() * u64::MAX as f64) as u64;
        self.start_with_seed(seed)
    }

    pub fn start_with_seed(&mut self, seed: u64) -> Result<usize, JsValue> {
        self.token = None;
        let record = self
            .session
            .start_run_with_seed(seed)
            .map_err(to_js_error)?;
        Ok(record.trajectory().len())
    }

    pub fn start_at(&mut self, start: Vec<f64>) -> Result<usize, JsValue> {
        self.token = None;
        let record = self.session.start_run_at(start).map_err(to_js_error)?;
        Ok(record.trajectory().len())
    }

    pub fn abort(&mut self) {
        self.token = None;
        self.session.abort();
    }

    pub fn len(&self) -> usize {
        self.session.trajectory().map_or(0, |t| t.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cursor(&self) -> Option<usize> {
        self.session.cursor()
    }

    /// Returns `false` once the cursor sits on the last step.
    pub fn step_forward(&mut self) -> Result<bool, JsValue> {
        self.token = None;
        match self.session.step_forward().map_err(to_js_error)? {
            Advance::Moved(_) => Ok(true),
            Advance::AtEnd => Ok(false),
        }
    }

    pub fn jump_to(&mut self, index: usize) -> Result<(), JsValue> {
        self.session.jump_to(index).map_err(to_js_error)?;
        Ok(())
    }

    pub fn play(&mut self, now: f64) -> Result<(), JsValue> {
        self.token = Some(self.session.play(now).map_err(to_js_error)?);
        Ok(())
    }

    pub fn pause(&mut self) {
        self.token = None;
        self.session.pause();
    }

    pub fn is_playing(&self) -> bool {
        self.token.is_some() && self.session.is_playing()
    }

    /// Called from the animation loop. Returns the cursor index when it moved.
    pub fn tick(&mut self, now: f64) -> Option<usize> {
        let token = self.token?;
        match self.session.tick(token, now) {
            TickOutcome::Advanced(index) => Some(index),
            TickOutcome::Finished(index) => {
                self.token = None;
                Some(index)
            }
            TickOutcome::Waiting => None,
            TickOutcome::Stale | TickOutcome::Inactive => {
                self.token = None;
                None
            }
        }
    }

    pub fn position_at(&self, index: usize) -> Result<Vec<f64>, JsValue> {
        Ok(self.step(index).map_err(to_js_error)?.position.clone())
    }

    pub fn value_at(&self, index: usize) -> Result<f64, JsValue> {
        Ok(self.step(index).map_err(to_js_error)?.value)
    }

    pub fn gradient_at(&self, index: usize) -> Result<Vec<f64>, JsValue> {
        Ok(self.step(index).map_err(to_js_error)?.gradient.clone())
    }

    /// One formatted line per recorded step.
    pub fn log_lines(&self) -> Vec<String> {
        let Some(record) = self.session.run() else {
            return Vec::new();
        };
        let learning_rate = record.config.learning_rate;
        record
            .trajectory()
            .iter()
            .map(|step| LogEntry::from_step(step, learning_rate).to_string())
            .collect()
    }

    pub fn termination(&self) -> Option<String> {
        self.session
            .run()
            .map(|record| record.termination().to_string())
    }

    /// `samples` values of the current curve between `min` and `max`, `NaN` where undefined.
    pub fn sample_curve(&self, min: f64, max: f64, samples: usize) -> Result<Vec<f64>, JsValue> {
        let function = self
            .session
            .function()
            .context("No function has been compiled.")
            .map_err(to_js_error)?;
        let axis = AxisSpec { min, max, samples };
        let curve = sample_curve(function, &axis).map_err(to_js_error)?;
        Ok(curve.values)
    }

    /// Row-major grid of surface values over a square domain.
    pub fn sample_surface(&self, min: f64, max: f64, samples: usize) -> Result<Vec<f64>, JsValue> {
        let function = self
            .session
            .function()
            .context("No function has been compiled.")
            .map_err(to_js_error)?;
        let axis = AxisSpec { min, max, samples };
        let surface = sample_surface(function, &axis, &axis).map_err(to_js_error)?;
        Ok(surface.values)
    }

    pub fn trajectory(&self) -> Result<JsValue, JsValue> {
        let record = self.record().map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(record.trajectory())
            .map_err(|err| JsValue::from_str(&format!("Failed to serialize trajectory: {err}")))
    }

    pub fn report(&self) -> Result<JsValue, JsValue> {
        let report = self.build_report().map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&report)
            .map_err(|err| JsValue::from_str(&format!("Failed to serialize report: {err}")))
    }

    pub fn report_text(&self) -> Result<String, JsValue> {
        Ok(self.build_report().map_err(to_js_error)?.render_text())
    }
}

impl WasmSession {
    fn record(&self) -> Result<&RunRecord> {
        self.session
            .run()
            .map(|record| &**record)
            .context("No descent has been run yet.")
    }

    fn step(&self, index: usize) -> Result<&Step> {
        let record = self.record()?;
        Ok(record.trajectory().step_at(index)?)
    }

    fn build_report(&self) -> Result<RunReport> {
        RunReport::build(self.record()?)
    }
}
