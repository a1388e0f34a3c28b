// Timer lifecycle: Idle -> Inspecting -> Running -> Stopped -> Idle.
// The host owns the real interval callbacks. This machine tells it which ticker
// to start and cancel, and at most one ticker is active at any instant.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::*;

/// Host-side interval callback driving the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ticker {
    /// Once per second while inspecting.
    Inspection,
    /// Display refresh while the solve is running.
    Running,
}

/// Audible/visual cue during inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InspectionCue {
    /// Short beep at 10 s and at 5..1 s.
    Beep,
    /// Countdown is low enough to start.
    Ready,
    /// Countdown hit zero; the solve starts on its own.
    Go,
}

/// Coarse lifecycle phase, reported to the host on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerPhase {
    Idle,
    Inspecting,
    Running,
    Stopped,
}

/// Full timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase")]
pub enum TimerState {
    Idle,
    Inspecting {
        remaining_secs: u32,
    },
    Running {
        started_at: Timestamp,
        /// Inspection ran out; the fixed penalty is added to the reported time.
        penalized: bool,
    },
    Stopped,
}

impl TimerState {
    pub fn phase(&self) -> TimerPhase {
        match self {
            TimerState::Idle => TimerPhase::Idle,
            TimerState::Inspecting { .. } => TimerPhase::Inspecting,
            TimerState::Running { .. } => TimerPhase::Running,
            TimerState::Stopped => TimerPhase::Stopped,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Inspecting { .. } => "inspecting",
            TimerState::Running { .. } => "running",
            TimerState::Stopped => "stopped",
        }
    }
}

/// Instruction or notification for the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TimerEvent {
    StartTicker { ticker: Ticker, interval_ms: u32 },
    CancelTicker { ticker: Ticker },
    PhaseChanged { phase: TimerPhase },
    Countdown { remaining_secs: u32 },
    Cue { cue: InspectionCue },
    Elapsed { elapsed: Millis },
}

/// Timing parameters taken from the session config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub inspection_secs: u32,
    pub inspection_penalty: Millis,
    pub ready_at_secs: u32,
    pub timer_tick_ms: u32,
    pub inspection_tick_ms: u32,
}

impl From<&SessionConfig> for TimerSettings {
    fn from(config: &SessionConfig) -> Self {
        TimerSettings {
            inspection_secs: config.inspection_duration_secs(),
            inspection_penalty: Millis::new(config.inspection_penalty_ms),
            ready_at_secs: config.ready_at_secs,
            timer_tick_ms: config.timer_tick_ms,
            inspection_tick_ms: config.inspection_tick_ms,
        }
    }
}

/// Timer state machine. Pure: every call takes the current time.
#[derive(Debug, Clone)]
pub struct TimerMachine {
    settings: TimerSettings,
    state: TimerState,
    active: Option<Ticker>,
}

impl TimerMachine {
    pub fn new(settings: TimerSettings) -> Self {
        TimerMachine {
            settings,
            state: TimerState::Idle,
            active: None,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn active_ticker(&self) -> Option<Ticker> {
        self.active
    }

    /// New settings apply from the next start.
    pub fn set_settings(&mut self, settings: TimerSettings) {
        self.settings = settings;
    }

    /// Start request. From idle this enters inspection (or runs directly when
    /// inspection is zero); during inspection it starts the solve early.
    pub fn start(&mut self, now: Timestamp) -> Result<Vec<TimerEvent>> {
        let mut events = Vec::new();
        match self.state {
            TimerState::Idle | TimerState::Stopped => {
                if self.settings.inspection_secs > 0 {
                    let remaining = self.settings.inspection_secs;
                    self.enter(TimerState::Inspecting { remaining_secs: remaining }, &mut events);
                    self.activate(Ticker::Inspection, &mut events);
                    events.push(TimerEvent::Countdown { remaining_secs: remaining });
                    if remaining <= self.settings.ready_at_secs {
                        events.push(TimerEvent::Cue { cue: InspectionCue::Ready });
                    }
                } else {
                    self.begin_running(now, false, &mut events);
                }
            }
            TimerState::Inspecting { .. } => {
                log::debug!("inspection ended early by the solver");
                self.begin_running(now, false, &mut events);
            }
            TimerState::Running { .. } => {
                return Err(CoreError::InvalidState {
                    action: "start",
                    state: self.state.name(),
                });
            }
        }
        Ok(events)
    }

    /// One inspection tick. Ticks that arrive after the inspection ticker was
    /// cancelled are dropped.
    pub fn inspection_tick(&mut self, now: Timestamp) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        let remaining = match self.state {
            TimerState::Inspecting { remaining_secs }
                if self.active == Some(Ticker::Inspection) =>
            {
                remaining_secs.saturating_sub(1)
            }
            _ => {
                log::debug!("dropping stale inspection tick while {}", self.state.name());
                return events;
            }
        };

        self.state = TimerState::Inspecting { remaining_secs: remaining };
        events.push(TimerEvent::Countdown { remaining_secs: remaining });

        if remaining == 10 || (1..=5).contains(&remaining) {
            events.push(TimerEvent::Cue { cue: InspectionCue::Beep });
        }
        if remaining > 0 && remaining == self.settings.ready_at_secs {
            events.push(TimerEvent::Cue { cue: InspectionCue::Ready });
        }

        if remaining == 0 {
            log::info!(
                "inspection ran out, adding {} ms",
                self.settings.inspection_penalty.as_millis()
            );
            events.push(TimerEvent::Cue { cue: InspectionCue::Go });
            self.begin_running(now, true, &mut events);
        }
        events
    }

    /// Display refresh while running.
    pub fn running_tick(&mut self, now: Timestamp) -> Vec<TimerEvent> {
        if self.active != Some(Ticker::Running) {
            return Vec::new();
        }
        match self.elapsed(now) {
            Some(elapsed) => vec![TimerEvent::Elapsed { elapsed }],
            None => Vec::new(),
        }
    }

    /// Reported solve time so far: wall-clock elapsed plus the inspection
    /// penalty when it applies. `None` unless running.
    pub fn elapsed(&self, now: Timestamp) -> Option<Millis> {
        match self.state {
            TimerState::Running {
                started_at,
                penalized,
            } => {
                let wall = now.since(started_at);
                Some(if penalized {
                    wall.saturating_add(self.settings.inspection_penalty)
                } else {
                    wall
                })
            }
            _ => None,
        }
    }

    /// Stop request. Returns the final reported time; the machine passes
    /// through `Stopped` and lands back in `Idle`.
    pub fn stop(&mut self, now: Timestamp) -> Result<(Millis, Vec<TimerEvent>)> {
        let elapsed = self.elapsed(now).ok_or(CoreError::InvalidState {
            action: "stop",
            state: self.state.name(),
        })?;

        let mut events = Vec::new();
        self.deactivate(&mut events);
        self.enter(TimerState::Stopped, &mut events);
        events.push(TimerEvent::Elapsed { elapsed });
        self.enter(TimerState::Idle, &mut events);
        Ok((elapsed, events))
    }

    /// Cancel whatever is ticking and go back to idle.
    pub fn reset(&mut self) -> Vec<TimerEvent> {
        let mut events = Vec::new();
        self.deactivate(&mut events);
        if self.state != TimerState::Idle {
            self.enter(TimerState::Idle, &mut events);
        }
        events
    }

    fn begin_running(&mut self, now: Timestamp, penalized: bool, events: &mut Vec<TimerEvent>) {
        self.enter(
            TimerState::Running {
                started_at: now,
                penalized,
            },
            events,
        );
        self.activate(Ticker::Running, events);
    }

    fn enter(&mut self, state: TimerState, events: &mut Vec<TimerEvent>) {
        log::debug!("timer {} -> {}", self.state.name(), state.name());
        self.state = state;
        events.push(TimerEvent::PhaseChanged {
            phase: state.phase(),
        });
    }

    /// Start a ticker, cancelling the other one first.
    fn activate(&mut self, ticker: Ticker, events: &mut Vec<TimerEvent>) {
        self.deactivate(events);
        let interval_ms = match ticker {
            Ticker::Inspection => self.settings.inspection_tick_ms,
            Ticker::Running => self.settings.timer_tick_ms,
        };
        self.active = Some(ticker);
        events.push(TimerEvent::StartTicker {
            ticker,
            interval_ms,
        });
    }

    fn deactivate(&mut self, events: &mut Vec<TimerEvent>) {
        if let Some(ticker) = self.active.take() {
            events.push(TimerEvent::CancelTicker { ticker });
        }
    }
}
