// cube_core: speedcubing timer Rust/WASM engine.
// Scrambles, solve statistics and the timer lifecycle live here; JS is plumbing
// (DOM, audio, speech, 3D viewer, hosted storage). See DESIGN.md.

mod clock;
mod error;
mod format;
mod scramble;
mod session;
mod stats;
mod timer;
mod types;

use wasm_bindgen::prelude::*;

pub use clock::{Clock, JsClock, ManualClock};
pub use error::{CoreError, Result};
pub use format::{format_average, format_millis, SkillLevel, StatsReport, NO_TIME};
pub use scramble::{Axis, Face, Modifier, Move, Scramble, ScrambleGenerator};
pub use session::{Session, SessionCommand, SessionEvent};
pub use stats::{Solve, SolveLog};
pub use timer::{
    InspectionCue, Ticker, TimerEvent, TimerMachine, TimerPhase, TimerSettings, TimerState,
};
pub use types::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn js_err(err: CoreError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Timer engine exposed to JavaScript.
/// Every mutating call returns a JSON array of `SessionEvent`s, so one
/// crossing carries everything the page needs to update.
#[wasm_bindgen]
pub struct TimerEngine {
    session: Session<JsClock>,
}

impl TimerEngine {
    fn from_config_json(config_json: &str) -> Result<TimerEngine> {
        let config = SessionConfig::from_json(config_json)?;
        Ok(TimerEngine {
            session: Session::new(config, JsClock)?,
        })
    }

    fn handle_json(&mut self, command_json: &str) -> Result<String> {
        let command: SessionCommand = serde_json::from_str(command_json)?;
        to_json(&self.session.handle(command)?)
    }

    fn load_solves_json(&mut self, solves_json: &str) -> Result<String> {
        let solves: Vec<Solve> = serde_json::from_str(solves_json)?;
        to_json(&self.session.load_solves(solves)?)
    }
}

#[wasm_bindgen]
impl TimerEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> std::result::Result<TimerEngine, JsValue> {
        TimerEngine::from_config_json(config_json).map_err(js_err)
    }

    /// Space bar: start, start early out of inspection, or stop.
    pub fn toggle(&mut self) -> std::result::Result<String, JsValue> {
        self.session
            .toggle()
            .and_then(|events| to_json(&events))
            .map_err(js_err)
    }

    pub fn start(&mut self) -> std::result::Result<String, JsValue> {
        self.session
            .start()
            .and_then(|events| to_json(&events))
            .map_err(js_err)
    }

    pub fn stop(&mut self) -> std::result::Result<String, JsValue> {
        self.session
            .stop()
            .and_then(|events| to_json(&events))
            .map_err(js_err)
    }

    pub fn reset(&mut self) -> std::result::Result<String, JsValue> {
        self.session
            .reset()
            .and_then(|events| to_json(&events))
            .map_err(js_err)
    }

    /// Called from the inspection interval.
    pub fn tick_inspection(&mut self) -> std::result::Result<String, JsValue> {
        to_json(&self.session.inspection_tick()).map_err(js_err)
    }

    /// Called from the running-timer interval.
    pub fn tick_running(&mut self) -> std::result::Result<String, JsValue> {
        to_json(&self.session.running_tick()).map_err(js_err)
    }

    /// Reported time of the running solve in milliseconds.
    pub fn elapsed_ms(&self) -> Option<f64> {
        self.session.elapsed().map(|ms| ms.as_millis() as f64)
    }

    /// Apply a JSON `SessionCommand`, e.g. `{"command":"new_scramble"}`.
    pub fn command(&mut self, command_json: &str) -> std::result::Result<String, JsValue> {
        self.handle_json(command_json).map_err(js_err)
    }

    /// Current scramble in standard notation.
    pub fn scramble(&self) -> String {
        self.session.scramble().to_string()
    }

    /// Best, Ao5, Ao12 and count, each with its display string.
    pub fn stats_json(&self) -> std::result::Result<String, JsValue> {
        to_json(&StatsReport::from(self.session.stats())).map_err(js_err)
    }

    pub fn solves_json(&self) -> std::result::Result<String, JsValue> {
        to_json(self.session.log().solves()).map_err(js_err)
    }

    /// Restore solves mirrored by the host (local storage or document store).
    pub fn load_solves(&mut self, solves_json: &str) -> std::result::Result<String, JsValue> {
        self.load_solves_json(solves_json).map_err(js_err)
    }

    pub fn state_json(&self) -> std::result::Result<String, JsValue> {
        to_json(&self.session.timer_state()).map_err(js_err)
    }

    /// Skill bracket for a time on the current puzzle.
    pub fn skill_level(&self, ms: f64) -> String {
        let time = Millis::new(ms.max(0.0) as u64);
        SkillLevel::estimate(self.session.config().puzzle, time)
            .label()
            .to_string()
    }

    /// `MM:SS.mmm` for display.
    pub fn format_time(ms: Option<f64>) -> String {
        format_millis(ms.map(|ms| Millis::new(ms.max(0.0) as u64)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_creation_works() {
        let config = r#"{"puzzle":"3x3","inspection_secs":0,"seed":3}"#;
        let engine = TimerEngine::new(config);
        assert!(engine.is_ok());
    }

    #[test]
    fn engine_round_trip() {
        let mut engine =
            TimerEngine::from_config_json(r#"{"inspection_enabled":false,"seed":11}"#).unwrap();
        assert_eq!(engine.scramble().split(' ').count(), 20);

        let started = engine.toggle().unwrap();
        assert!(started.contains("StartTicker"));
        assert!(engine.elapsed_ms().is_some());

        let stopped = engine.toggle().unwrap();
        assert!(stopped.contains("SolveRecorded"));

        let report: StatsReport = serde_json::from_str(&engine.stats_json().unwrap()).unwrap();
        assert_eq!(report.stats.count, 1);
        assert_eq!(report.best_text, format_millis(report.stats.best));
        assert_eq!(report.ao5_text, NO_TIME);

        let solves = engine.solves_json().unwrap();
        let mut other = TimerEngine::from_config_json("{}").unwrap();
        other.load_solves_json(&solves).unwrap();
        assert_eq!(other.session.log().count(), 1);
    }

    #[test]
    fn engine_commands_from_json() {
        let mut engine = TimerEngine::from_config_json(r#"{"seed":1}"#).unwrap();
        let out = engine
            .handle_json(r#"{"command":"set_puzzle","puzzle":"2x2"}"#)
            .unwrap();
        assert!(out.contains("ScrambleChanged"));
        assert_eq!(engine.scramble().split(' ').count(), 11);

        let state = engine.state_json().unwrap();
        assert_eq!(state, r#"{"phase":"Idle"}"#);
    }

    #[test]
    fn bad_config_is_reported() {
        let err = TimerEngine::from_config_json(r#"{"timer_tick_ms":0}"#).err().unwrap();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn load_rejects_shared_ids() {
        let mut engine = TimerEngine::from_config_json(r#"{"inspection_enabled":false}"#).unwrap();
        engine.toggle().unwrap();
        engine.toggle().unwrap();
        let solves: Vec<Solve> = serde_json::from_str(&engine.solves_json().unwrap()).unwrap();
        let doubled = serde_json::to_string(&[solves[0].clone(), solves[0].clone()]).unwrap();

        let err = engine.load_solves_json(&doubled).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateSolveId(_)));
        assert_eq!(engine.session.log().count(), 1);
    }

    #[test]
    fn skill_level_uses_session_puzzle() {
        let mut engine = TimerEngine::from_config_json("{}").unwrap();
        assert_eq!(engine.skill_level(20_000.0), "Advanced");
        engine
            .handle_json(r#"{"command":"set_puzzle","puzzle":"2x2"}"#)
            .unwrap();
        assert_eq!(engine.skill_level(20_000.0), "General");
    }

    #[test]
    fn format_time_helper() {
        assert_eq!(TimerEngine::format_time(Some(61_001.0)), "01:01.001");
        assert_eq!(TimerEngine::format_time(None), NO_TIME);
    }
}
