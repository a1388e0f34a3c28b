// Strong typing over strings. Newtypes for durations, timestamps, and solve ids.
// Session configuration passed from JS lives here too.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Duration in milliseconds. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Millis(u64);

impl Millis {
    pub const ZERO: Millis = Millis(0);

    pub fn new(ms: u64) -> Self {
        Millis(ms)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn saturating_add(self, other: Millis) -> Millis {
        Millis(self.0.saturating_add(other.0))
    }
}

/// Host clock reading in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_millis(ms: u64) -> Self {
        Timestamp(ms)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`. Clamps to zero if the clock went backwards.
    pub fn since(&self, earlier: Timestamp) -> Millis {
        Millis(self.0.saturating_sub(earlier.0))
    }
}

/// Local solve identifier, assigned by the solve log on append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SolveId(u64);

impl SolveId {
    pub fn new(id: u64) -> Self {
        SolveId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SolveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Penalty annotation a user can put on a recorded solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Penalty {
    /// Two seconds added to the raw time.
    #[serde(rename = "+2")]
    PlusTwo,
    /// Did not finish.
    #[serde(rename = "DNF")]
    Dnf,
}

impl Penalty {
    pub const PLUS_TWO_MS: u64 = 2000;
}

/// Puzzle being scrambled and timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PuzzleKind {
    #[serde(rename = "2x2")]
    Cube2,
    #[default]
    #[serde(rename = "3x3")]
    Cube3,
    #[serde(rename = "4x4")]
    Cube4,
}

impl PuzzleKind {
    /// Scramble length used when the caller does not ask for one.
    pub fn default_scramble_length(&self) -> usize {
        match self {
            PuzzleKind::Cube2 => 11,
            PuzzleKind::Cube3 => 20,
            PuzzleKind::Cube4 => 40,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PuzzleKind::Cube2 => "2x2",
            PuzzleKind::Cube3 => "3x3",
            PuzzleKind::Cube4 => "4x4",
        }
    }
}

/// Result of an average-of-N query over a full window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Average {
    /// Trimmed mean in milliseconds.
    Time { ms: f64 },
    /// The window contains a DNF.
    Dnf,
}

impl Average {
    pub fn ms(&self) -> Option<f64> {
        match self {
            Average::Time { ms } => Some(*ms),
            Average::Dnf => None,
        }
    }
}

/// Snapshot of every derived statistic, returned to JS in one crossing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub best: Option<Millis>,
    pub ao5: Option<Average>,
    pub ao12: Option<Average>,
    pub count: usize,
}

/// Session configuration passed from JS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub puzzle: PuzzleKind,
    #[serde(default = "default_true")]
    pub inspection_enabled: bool,
    /// Inspection countdown length. Zero disables inspection.
    #[serde(default = "default_inspection_secs")]
    pub inspection_secs: u32,
    /// Added to the reported time when inspection runs out.
    #[serde(default = "default_inspection_penalty_ms")]
    pub inspection_penalty_ms: u64,
    /// Countdown value at or below which the host shows the "ready" state.
    #[serde(default = "default_ready_at_secs")]
    pub ready_at_secs: u32,
    #[serde(default = "default_timer_tick_ms")]
    pub timer_tick_ms: u32,
    #[serde(default = "default_inspection_tick_ms")]
    pub inspection_tick_ms: u32,
    /// Fixed seed for reproducible scrambles. Entropy from the host otherwise.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_true() -> bool {
    true
}

fn default_inspection_secs() -> u32 {
    15
}

fn default_inspection_penalty_ms() -> u64 {
    Penalty::PLUS_TWO_MS
}

fn default_ready_at_secs() -> u32 {
    8
}

fn default_timer_tick_ms() -> u32 {
    10
}

fn default_inspection_tick_ms() -> u32 {
    1000
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            puzzle: PuzzleKind::default(),
            inspection_enabled: true,
            inspection_secs: default_inspection_secs(),
            inspection_penalty_ms: default_inspection_penalty_ms(),
            ready_at_secs: default_ready_at_secs(),
            timer_tick_ms: default_timer_tick_ms(),
            inspection_tick_ms: default_inspection_tick_ms(),
            seed: None,
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timer_tick_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "timer_tick_ms must be positive".to_string(),
            ));
        }
        if self.inspection_tick_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "inspection_tick_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective countdown length, zero when inspection is switched off.
    pub fn inspection_duration_secs(&self) -> u32 {
        if self.inspection_enabled {
            self.inspection_secs
        } else {
            0
        }
    }
}
