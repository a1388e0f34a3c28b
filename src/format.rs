// Display helpers shared by the host UI and spoken stats.

use serde::{Deserialize, Serialize};

use crate::types::{Average, Millis, PuzzleKind, StatsSummary};

/// Placeholder shown when a statistic has no value yet.
pub const NO_TIME: &str = "--:--.--";

/// `MM:SS.mmm`, or the placeholder for `None`.
pub fn format_millis(ms: Option<Millis>) -> String {
    match ms {
        Some(ms) => format_raw(ms.as_millis()),
        None => NO_TIME.to_string(),
    }
}

/// Average for display. Fractional milliseconds are truncated.
pub fn format_average(avg: Option<Average>) -> String {
    match avg {
        Some(Average::Time { ms }) => format_raw(ms as u64),
        Some(Average::Dnf) => "DNF".to_string(),
        None => NO_TIME.to_string(),
    }
}

/// Statistics plus their display strings, as handed to the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    #[serde(flatten)]
    pub stats: StatsSummary,
    pub best_text: String,
    pub ao5_text: String,
    pub ao12_text: String,
}

impl From<StatsSummary> for StatsReport {
    fn from(stats: StatsSummary) -> Self {
        StatsReport {
            best_text: format_millis(stats.best),
            ao5_text: format_average(stats.ao5),
            ao12_text: format_average(stats.ao12),
            stats,
        }
    }
}

fn format_raw(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{minutes:02}:{seconds:02}.{millis:03}")
}

/// Rough skill bracket from a single solve time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillLevel {
    Beginner,
    Novice,
    Intermediate,
    Advanced,
    Expert,
    /// No thresholds for this puzzle.
    General,
}

impl SkillLevel {
    pub fn estimate(puzzle: PuzzleKind, time: Millis) -> SkillLevel {
        if puzzle != PuzzleKind::Cube3 {
            return SkillLevel::General;
        }
        match time.as_millis() {
            t if t > 120_000 => SkillLevel::Beginner,
            t if t > 60_000 => SkillLevel::Novice,
            t if t > 30_000 => SkillLevel::Intermediate,
            t if t > 15_000 => SkillLevel::Advanced,
            _ => SkillLevel::Expert,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "Beginner",
            SkillLevel::Novice => "Novice",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Advanced => "Advanced",
            SkillLevel::Expert => "Expert",
            SkillLevel::General => "General",
        }
    }
}
