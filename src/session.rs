// Session: the single orchestrating context for one timing session.
// Holds the timer, current scramble, solve log, config, clock and RNG. Every
// call returns a batch of typed events for the host to act on.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::Result;
use crate::scramble::{Scramble, ScrambleGenerator};
use crate::stats::{Solve, SolveLog};
use crate::timer::{TimerEvent, TimerMachine, TimerSettings, TimerState};
use crate::types::*;

/// Typed command from the host's input, voice, or NLU layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SessionCommand {
    StartTimer,
    StopTimer,
    NewScramble,
    ResetTimer,
    ToggleInspection,
    SetPuzzle {
        puzzle: PuzzleKind,
    },
    ApplyPenalty {
        id: SolveId,
        #[serde(default)]
        penalty: Option<Penalty>,
    },
    DeleteSolve {
        id: SolveId,
    },
    AttachExternalId {
        id: SolveId,
        external_id: String,
    },
    QueryStats,
}

/// Notification for the host. Persistence and rendering hang off these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum SessionEvent {
    Timer(TimerEvent),
    ScrambleChanged { scramble: Scramble },
    SolveRecorded { solve: Solve },
    SolveUpdated { solve: Solve },
    SolveRemoved { id: SolveId },
    StatsChanged { stats: StatsSummary },
    SettingsChanged { config: SessionConfig },
    CommandIgnored { reason: String },
}

fn timer_events(events: Vec<TimerEvent>) -> impl Iterator<Item = SessionEvent> {
    events.into_iter().map(SessionEvent::Timer)
}

pub struct Session<C: Clock> {
    config: SessionConfig,
    clock: C,
    rng: StdRng,
    generator: ScrambleGenerator,
    timer: TimerMachine,
    scramble: Scramble,
    log: SolveLog,
}

impl<C: Clock> Session<C> {
    pub fn new(config: SessionConfig, clock: C) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let generator = ScrambleGenerator::new(config.puzzle);
        let scramble = generator.generate_default(&mut rng)?;
        log::info!("session started for {}", config.puzzle.label());

        Ok(Session {
            timer: TimerMachine::new(TimerSettings::from(&config)),
            config,
            clock,
            rng,
            generator,
            scramble,
            log: SolveLog::new(),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn scramble(&self) -> &Scramble {
        &self.scramble
    }

    pub fn log(&self) -> &SolveLog {
        &self.log
    }

    pub fn timer_state(&self) -> TimerState {
        self.timer.state()
    }

    pub fn stats(&self) -> StatsSummary {
        self.log.summary()
    }

    /// Reported solve time so far, `None` unless running.
    pub fn elapsed(&self) -> Option<Millis> {
        self.timer.elapsed(self.clock.now())
    }

    /// Space bar: stop when running, start otherwise.
    pub fn toggle(&mut self) -> Result<Vec<SessionEvent>> {
        if matches!(self.timer.state(), TimerState::Running { .. }) {
            self.stop()
        } else {
            self.start()
        }
    }

    pub fn start(&mut self) -> Result<Vec<SessionEvent>> {
        let events = self.timer.start(self.clock.now())?;
        Ok(timer_events(events).collect())
    }

    /// Stop the solve, record it against the current scramble, and prepare the
    /// next scramble.
    pub fn stop(&mut self) -> Result<Vec<SessionEvent>> {
        let now = self.clock.now();
        let (elapsed, events) = self.timer.stop(now)?;
        let mut out: Vec<SessionEvent> = timer_events(events).collect();

        let id = self.log.record(elapsed, self.scramble.clone(), now);
        log::info!("recorded solve {} in {} ms", id, elapsed.as_millis());
        if let Some(solve) = self.log.get(id) {
            out.push(SessionEvent::SolveRecorded {
                solve: solve.clone(),
            });
        }
        out.push(SessionEvent::StatsChanged { stats: self.stats() });
        out.push(self.next_scramble()?);
        Ok(out)
    }

    pub fn inspection_tick(&mut self) -> Vec<SessionEvent> {
        let events = self.timer.inspection_tick(self.clock.now());
        timer_events(events).collect()
    }

    pub fn running_tick(&mut self) -> Vec<SessionEvent> {
        let events = self.timer.running_tick(self.clock.now());
        timer_events(events).collect()
    }

    /// Cancel any ticker, return to idle, and draw a fresh scramble.
    pub fn reset(&mut self) -> Result<Vec<SessionEvent>> {
        let mut out: Vec<SessionEvent> = timer_events(self.timer.reset()).collect();
        out.push(self.next_scramble()?);
        Ok(out)
    }

    /// Switch puzzle. Resets the timer since the old scramble no longer applies.
    pub fn set_puzzle(&mut self, puzzle: PuzzleKind) -> Result<Vec<SessionEvent>> {
        self.config.puzzle = puzzle;
        self.generator = ScrambleGenerator::new(puzzle);
        let mut out = vec![SessionEvent::SettingsChanged {
            config: self.config.clone(),
        }];
        out.extend(self.reset()?);
        Ok(out)
    }

    /// Turn inspection on or off. Takes effect from the next start.
    pub fn set_inspection(&mut self, enabled: bool) -> Vec<SessionEvent> {
        self.config.inspection_enabled = enabled;
        self.timer.set_settings(TimerSettings::from(&self.config));
        vec![SessionEvent::SettingsChanged {
            config: self.config.clone(),
        }]
    }

    pub fn remove_solve(&mut self, id: SolveId) -> Result<Vec<SessionEvent>> {
        self.log.remove(id)?;
        Ok(vec![
            SessionEvent::SolveRemoved { id },
            SessionEvent::StatsChanged { stats: self.stats() },
        ])
    }

    pub fn apply_penalty(
        &mut self,
        id: SolveId,
        penalty: Option<Penalty>,
    ) -> Result<Vec<SessionEvent>> {
        self.log.apply_penalty(id, penalty)?;
        let mut out = self.updated(id);
        out.push(SessionEvent::StatsChanged { stats: self.stats() });
        Ok(out)
    }

    /// Called once the persistence collaborator confirms a write.
    pub fn attach_external_id(
        &mut self,
        id: SolveId,
        external_id: String,
    ) -> Result<Vec<SessionEvent>> {
        self.log.attach_external_id(id, external_id)?;
        Ok(self.updated(id))
    }

    /// Replace the log with solves restored by the host. On error the
    /// current log is kept.
    pub fn load_solves(&mut self, solves: Vec<Solve>) -> Result<Vec<SessionEvent>> {
        log::debug!("restoring {} solves", solves.len());
        self.log = SolveLog::from_solves(solves)?;
        Ok(vec![SessionEvent::StatsChanged { stats: self.stats() }])
    }

    /// Apply a host command. Start/stop requests that do not fit the current
    /// phase are reported back instead of failing.
    pub fn handle(&mut self, command: SessionCommand) -> Result<Vec<SessionEvent>> {
        log::debug!("handling {:?}", command);
        match command {
            SessionCommand::StartTimer => {
                if matches!(self.timer.state(), TimerState::Running { .. }) {
                    Ok(ignored("timer is already running"))
                } else {
                    self.start()
                }
            }
            SessionCommand::StopTimer => {
                if matches!(self.timer.state(), TimerState::Running { .. }) {
                    self.stop()
                } else {
                    Ok(ignored("timer is not running"))
                }
            }
            SessionCommand::NewScramble | SessionCommand::ResetTimer => self.reset(),
            SessionCommand::ToggleInspection => {
                let enabled = !self.config.inspection_enabled;
                Ok(self.set_inspection(enabled))
            }
            SessionCommand::SetPuzzle { puzzle } => self.set_puzzle(puzzle),
            SessionCommand::ApplyPenalty { id, penalty } => self.apply_penalty(id, penalty),
            SessionCommand::DeleteSolve { id } => self.remove_solve(id),
            SessionCommand::AttachExternalId { id, external_id } => {
                self.attach_external_id(id, external_id)
            }
            SessionCommand::QueryStats => Ok(vec![SessionEvent::StatsChanged {
                stats: self.stats(),
            }]),
        }
    }

    fn next_scramble(&mut self) -> Result<SessionEvent> {
        self.scramble = self.generator.generate_default(&mut self.rng)?;
        Ok(SessionEvent::ScrambleChanged {
            scramble: self.scramble.clone(),
        })
    }

    fn updated(&self, id: SolveId) -> Vec<SessionEvent> {
        self.log
            .get(id)
            .map(|solve| SessionEvent::SolveUpdated {
                solve: solve.clone(),
            })
            .into_iter()
            .collect()
    }
}

fn ignored(reason: &str) -> Vec<SessionEvent> {
    log::warn!("command ignored: {}", reason);
    vec![SessionEvent::CommandIgnored {
        reason: reason.to_string(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::CoreError;
    use crate::timer::{Ticker, TimerPhase};

    fn session(inspection_secs: u32) -> (Session<ManualClock>, ManualClock) {
        let clock = ManualClock::new(Timestamp::from_millis(1_000_000));
        let config = SessionConfig {
            inspection_secs,
            seed: Some(7),
            ..SessionConfig::default()
        };
        (Session::new(config, clock.clone()).unwrap(), clock)
    }

    fn solve_in(
        session: &mut Session<ManualClock>,
        clock: &ManualClock,
        ms: u64,
    ) -> Vec<SessionEvent> {
        session.start().unwrap();
        clock.advance(Millis::new(ms));
        session.stop().unwrap()
    }

    #[test]
    fn stop_records_solve_with_scramble_used() {
        let (mut session, clock) = session(0);
        let used = session.scramble().clone();
        let events = solve_in(&mut session, &clock, 12_345);

        let solve = &session.log().solves()[0];
        assert_eq!(solve.duration, Millis::new(12_345));
        assert_eq!(solve.scramble, used);
        assert_eq!(solve.created_at, Timestamp::from_millis(1_012_345));
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::SolveRecorded { .. })));
        assert!(matches!(events.last(), Some(SessionEvent::ScrambleChanged { .. })));
        assert_ne!(session.scramble(), &used);
        assert_eq!(session.timer_state(), TimerState::Idle);
    }

    #[test]
    fn inspection_timeout_penalty_reaches_log() {
        let (mut session, clock) = session(2);
        session.toggle().unwrap();
        clock.advance(Millis::new(1000));
        session.inspection_tick();
        clock.advance(Millis::new(1000));
        session.inspection_tick();
        assert!(matches!(
            session.timer_state(),
            TimerState::Running { penalized: true, .. }
        ));

        clock.advance(Millis::new(8000));
        assert_eq!(session.elapsed(), Some(Millis::new(10_000)));
        session.toggle().unwrap();
        assert_eq!(session.log().solves()[0].duration, Millis::new(10_000));
    }

    #[test]
    fn stats_track_recorded_solves() {
        let (mut session, clock) = session(0);
        for ms in [1000, 1100, 900, 1050, 2000] {
            solve_in(&mut session, &clock, ms);
        }
        let stats = session.stats();
        assert_eq!(stats.count, 5);
        assert_eq!(stats.best, Some(Millis::new(900)));
        assert_eq!(stats.ao5, Some(Average::Time { ms: 1050.0 }));
        assert_eq!(stats.ao12, None);
    }

    #[test]
    fn commands_drive_the_session() {
        let (mut session, clock) = session(0);
        let events = session.handle(SessionCommand::StopTimer).unwrap();
        assert!(matches!(events[0], SessionEvent::CommandIgnored { .. }));

        session.handle(SessionCommand::StartTimer).unwrap();
        let events = session.handle(SessionCommand::StartTimer).unwrap();
        assert!(matches!(events[0], SessionEvent::CommandIgnored { .. }));

        clock.advance(Millis::new(5000));
        session.handle(SessionCommand::StopTimer).unwrap();
        let id = session.log().solves()[0].id;

        session
            .handle(SessionCommand::ApplyPenalty {
                id,
                penalty: Some(Penalty::PlusTwo),
            })
            .unwrap();
        assert_eq!(session.stats().best, Some(Millis::new(7000)));

        session
            .handle(SessionCommand::AttachExternalId {
                id,
                external_id: "abc".to_string(),
            })
            .unwrap();
        assert_eq!(session.log().solves()[0].external_id.as_deref(), Some("abc"));

        session.handle(SessionCommand::DeleteSolve { id }).unwrap();
        assert_eq!(session.stats().count, 0);
        assert_eq!(
            session.handle(SessionCommand::DeleteSolve { id }).unwrap_err(),
            CoreError::SolveNotFound(id)
        );
    }

    #[test]
    fn toggle_inspection_command() {
        let (mut session, _clock) = session(15);
        session.handle(SessionCommand::ToggleInspection).unwrap();
        assert!(!session.config().inspection_enabled);
        let events = session.start().unwrap();
        assert!(events.contains(&SessionEvent::Timer(TimerEvent::PhaseChanged {
            phase: TimerPhase::Running
        })));
    }

    #[test]
    fn set_puzzle_resets_and_rescrambles() {
        let (mut session, _clock) = session(15);
        session.start().unwrap();
        let events = session
            .handle(SessionCommand::SetPuzzle {
                puzzle: PuzzleKind::Cube2,
            })
            .unwrap();
        assert!(events.contains(&SessionEvent::Timer(TimerEvent::CancelTicker {
            ticker: Ticker::Inspection
        })));
        assert_eq!(session.timer_state(), TimerState::Idle);
        assert_eq!(session.scramble().len(), 11);
    }

    #[test]
    fn load_solves_replaces_log() {
        let (mut source, clock) = session(0);
        solve_in(&mut source, &clock, 1500);
        solve_in(&mut source, &clock, 1200);
        let exported = serde_json::to_string(source.log().solves()).unwrap();

        let (mut target, _) = session(0);
        let solves: Vec<Solve> = serde_json::from_str(&exported).unwrap();
        target.load_solves(solves).unwrap();
        assert_eq!(target.stats().count, 2);
        assert_eq!(target.stats().best, Some(Millis::new(1200)));
    }

    #[test]
    fn load_solves_with_shared_ids_keeps_current_log() {
        let (mut source, clock) = session(0);
        solve_in(&mut source, &clock, 1500);
        let mut solves = source.log().solves().to_vec();
        solves.push(solves[0].clone());

        let (mut target, target_clock) = session(0);
        solve_in(&mut target, &target_clock, 900);
        assert_eq!(
            target.load_solves(solves).unwrap_err(),
            CoreError::DuplicateSolveId(SolveId::new(1))
        );
        assert_eq!(target.stats().count, 1);
        assert_eq!(target.stats().best, Some(Millis::new(900)));
    }

    #[test]
    fn command_json_shape() {
        let command: SessionCommand =
            serde_json::from_str(r#"{"command":"set_puzzle","puzzle":"4x4"}"#).unwrap();
        assert_eq!(
            command,
            SessionCommand::SetPuzzle {
                puzzle: PuzzleKind::Cube4
            }
        );
        let command: SessionCommand =
            serde_json::from_str(r#"{"command":"apply_penalty","id":3}"#).unwrap();
        assert_eq!(
            command,
            SessionCommand::ApplyPenalty {
                id: SolveId::new(3),
                penalty: None
            }
        );
    }

    #[test]
    fn seeded_sessions_share_scrambles() {
        let (a, _) = session(0);
        let (b, _) = session(0);
        assert_eq!(a.scramble(), b.scramble());
    }
}
