// Solve log and derived statistics (best, Ao5, Ao12).
// Statistics are always recomputed from the log. The trimmed mean does not
// survive removal as a running sum, so nothing here is cached.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::scramble::Scramble;
use crate::types::*;

/// A recorded solve. Raw duration, scramble and timestamp never change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solve {
    pub id: SolveId,
    pub duration: Millis,
    pub scramble: Scramble,
    pub created_at: Timestamp,
    /// Identifier assigned by the persistence layer once the write lands.
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub penalty: Option<Penalty>,
}

impl Solve {
    /// Time that counts for statistics. `None` for a DNF.
    pub fn effective_duration(&self) -> Option<Millis> {
        match self.penalty {
            None => Some(self.duration),
            Some(Penalty::PlusTwo) => Some(
                self.duration
                    .saturating_add(Millis::new(Penalty::PLUS_TWO_MS)),
            ),
            Some(Penalty::Dnf) => None,
        }
    }
}

/// Number of entries dropped from each end of the sorted window.
fn trim_count(window: usize) -> Result<usize> {
    match window {
        0 => Err(CoreError::InvalidAverageWindow(window)),
        5 => Ok(1),
        12 => Ok(2),
        _ => Err(CoreError::UnsupportedAverageWindow(window)),
    }
}

/// Append-only, chronologically ordered solve log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveLog {
    solves: Vec<Solve>,
    next_id: u64,
}

impl SolveLog {
    pub fn new() -> Self {
        SolveLog {
            solves: Vec::new(),
            next_id: 1,
        }
    }

    /// Rebuild a log from solves recorded earlier, e.g. restored by the host.
    /// Entries are ordered by creation time; ids keep their values and new ids
    /// continue after the largest one. Two solves sharing an id are rejected.
    pub fn from_solves(mut solves: Vec<Solve>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(solves.len());
        if let Some(dup) = solves.iter().find(|s| !seen.insert(s.id)) {
            return Err(CoreError::DuplicateSolveId(dup.id));
        }

        solves.sort_by_key(|s| s.created_at);
        let next_id = solves
            .iter()
            .map(|s| s.id.as_u64())
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        Ok(SolveLog { solves, next_id })
    }

    /// Record a new solve and return the id it was given.
    pub fn record(
        &mut self,
        duration: Millis,
        scramble: Scramble,
        created_at: Timestamp,
    ) -> SolveId {
        let id = SolveId::new(self.next_id.max(1));
        self.next_id = id.as_u64() + 1;
        self.append(Solve {
            id,
            duration,
            scramble,
            created_at,
            external_id: None,
            penalty: None,
        });
        id
    }

    /// Push a solve to the end of the log.
    pub fn append(&mut self, solve: Solve) {
        if solve.id.as_u64() >= self.next_id {
            self.next_id = solve.id.as_u64() + 1;
        }
        self.solves.push(solve);
    }

    /// Remove a single solve by id.
    pub fn remove(&mut self, id: SolveId) -> Result<Solve> {
        let index = self.index_of(id)?;
        Ok(self.solves.remove(index))
    }

    /// Attach the persistence layer's identifier after a confirmed write.
    pub fn attach_external_id(
        &mut self,
        id: SolveId,
        external_id: impl Into<String>,
    ) -> Result<()> {
        let index = self.index_of(id)?;
        self.solves[index].external_id = Some(external_id.into());
        Ok(())
    }

    /// Set or clear the penalty annotation on a solve.
    pub fn apply_penalty(&mut self, id: SolveId, penalty: Option<Penalty>) -> Result<()> {
        let index = self.index_of(id)?;
        self.solves[index].penalty = penalty;
        Ok(())
    }

    pub fn get(&self, id: SolveId) -> Option<&Solve> {
        self.solves.iter().find(|s| s.id == id)
    }

    pub fn find_external(&self, external_id: &str) -> Option<&Solve> {
        self.solves
            .iter()
            .find(|s| s.external_id.as_deref() == Some(external_id))
    }

    pub fn solves(&self) -> &[Solve] {
        &self.solves
    }

    pub fn last(&self) -> Option<&Solve> {
        self.solves.last()
    }

    pub fn count(&self) -> usize {
        self.solves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solves.is_empty()
    }

    /// Fastest effective time; DNF solves never count.
    pub fn best(&self) -> Option<Millis> {
        self.solves.iter().filter_map(Solve::effective_duration).min()
    }

    /// Trimmed mean over the most recent `n` solves.
    ///
    /// `Ok(None)` when fewer than `n` solves exist. Only the Ao5 (drop one from
    /// each end) and Ao12 (drop two from each end) rules are defined.
    pub fn average_of(&self, n: usize) -> Result<Option<Average>> {
        let trim = trim_count(n)?;
        if self.solves.len() < n {
            return Ok(None);
        }

        let window = &self.solves[self.solves.len() - n..];
        let mut times = Vec::with_capacity(n);
        for solve in window {
            match solve.effective_duration() {
                Some(ms) => times.push(ms.as_millis()),
                None => return Ok(Some(Average::Dnf)),
            }
        }

        times.sort_unstable();
        let kept = &times[trim..n - trim];
        // Restored durations are unbounded; u128 holds any window of u64s.
        let sum: u128 = kept.iter().map(|&t| u128::from(t)).sum();
        Ok(Some(Average::Time {
            ms: sum as f64 / kept.len() as f64,
        }))
    }

    pub fn ao5(&self) -> Option<Average> {
        self.average_of(5).ok().flatten()
    }

    pub fn ao12(&self) -> Option<Average> {
        self.average_of(12).ok().flatten()
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            best: self.best(),
            ao5: self.ao5(),
            ao12: self.ao12(),
            count: self.count(),
        }
    }

    fn index_of(&self, id: SolveId) -> Result<usize> {
        self.solves
            .iter()
            .position(|s| s.id == id)
            .ok_or(CoreError::SolveNotFound(id))
    }
}
