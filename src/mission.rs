use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mission lifecycle states. Exactly one is active at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionState {
    Idle,
    Scanning,
    Paused,
    ReturningToBase,
}

impl MissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionState::Idle => "Idle",
            MissionState::Scanning => "Scanning",
            MissionState::Paused => "Paused",
            MissionState::ReturningToBase => "Returning to Base",
        }
    }
}

impl core::fmt::Display for MissionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator commands. None carries a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionCommand {
    Start,
    Pause,
    Terminate,
    ReturnToBase,
}

impl MissionCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionCommand::Start => "Start",
            MissionCommand::Pause => "Pause",
            MissionCommand::Terminate => "Terminate",
            MissionCommand::ReturnToBase => "ReturnToBase",
        }
    }
}

impl core::fmt::Display for MissionCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected command. The machine keeps its prior state; the caller may retry
/// with a legal command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("command {command} is not legal in state {state}")]
pub struct IllegalTransition {
    pub state: MissionState,
    pub command: MissionCommand,
}

/// Applies one command to a state without side effects.
///
/// Anything not matched below is rejected: `Start` while already scanning,
/// every command while `Idle` except `Start`, `Pause` while paused, and
/// re-issuing `ReturnToBase` while already returning.
pub fn transition(
    state: MissionState,
    command: MissionCommand,
) -> Result<MissionState, IllegalTransition> {
    use MissionCommand::*;
    use MissionState::*;

    match (state, command) {
        (Idle, Start) => Ok(Scanning),
        (Paused, Start) => Ok(Scanning),
        (Scanning, Pause) => Ok(Paused),
        (Scanning | Paused | ReturningToBase, Terminate) => Ok(Idle),
        (Scanning | Paused, ReturnToBase) => Ok(ReturningToBase),
        _ => Err(IllegalTransition { state, command }),
    }
}

/// One accepted transition, as delivered to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    pub previous: MissionState,
    pub current: MissionState,
    pub command: MissionCommand,
    pub at_ms: u64,
    pub scan_session: u32,
}

/// Authoritative lifecycle holder: current state plus scan-session numbering.
///
/// A scan session is a maximal continuous interval of `Scanning`; each
/// accepted entry into `Scanning` opens the next numbered session.
#[derive(Debug)]
pub struct MissionMachine {
    state: MissionState,
    scan_session: u32,
    last_transition_ms: u64,
}

impl MissionMachine {
    pub fn new() -> Self {
        Self {
            state: MissionState::Idle,
            scan_session: 0,
            last_transition_ms: 0,
        }
    }

    pub fn state(&self) -> MissionState {
        self.state
    }

    /// Session ordinal of the most recent `Scanning` entry; 0 before the
    /// first one.
    pub fn scan_session(&self) -> u32 {
        self.scan_session
    }

    pub fn last_transition_ms(&self) -> u64 {
        self.last_transition_ms
    }

    /// Validates and applies one command. Rejections leave every field
    /// untouched.
    pub fn issue(
        &mut self,
        command: MissionCommand,
        now_ms: u64,
    ) -> Result<StateChange, IllegalTransition> {
        let next = transition(self.state, command)?;
        let previous = self.state;

        // Every legal transition moves to a different state.
        debug_assert!(previous != next);

        self.state = next;
        self.last_transition_ms = now_ms;
        if next == MissionState::Scanning {
            self.scan_session = self.scan_session.wrapping_add(1);
        }

        Ok(StateChange {
            previous,
            current: next,
            command,
            at_ms: now_ms,
            scan_session: self.scan_session,
        })
    }
}

impl Default for MissionMachine {
    fn default() -> Self {
        Self::new()
    }
}
