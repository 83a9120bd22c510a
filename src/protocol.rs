use crate::controller::StatusSnapshot;
use crate::mission::{IllegalTransition, MissionCommand, MissionState};
use crate::scanlog::RecordId;
use arrayvec::ArrayString;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;
use thiserror::Error;

pub const MAX_COMMAND_SIZE: usize = 256;
pub const MAX_RESPONSE_SIZE: usize = 512;
pub const MAX_SNAPSHOT_SIZE: usize = 4096;

// A response echoes the command and adds fields; a snapshot carries the
// recent-scan window on top of that.
const_assert!(MAX_COMMAND_SIZE <= MAX_RESPONSE_SIZE);
const_assert!(MAX_RESPONSE_SIZE <= MAX_SNAPSHOT_SIZE);

pub type CommandBuffer = ArrayString<MAX_COMMAND_SIZE>;
pub type ResponseBuffer = ArrayString<MAX_RESPONSE_SIZE>;
pub type SnapshotBuffer = ArrayString<MAX_SNAPSHOT_SIZE>;

/// One operator command as received on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorCommand {
    pub id: u32,
    pub timestamp: u64,
    pub command: MissionCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    Accepted,
    Rejected,
    Error,
}

/// Reply to one [`OperatorCommand`]. `state` carries the mission state after
/// the command (unchanged when rejected); `message` explains rejections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub id: u32,
    pub timestamp: u64,
    pub status: ResponseStatus,
    pub state: Option<MissionState>,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn accepted(id: u32, timestamp: u64, state: MissionState) -> Self {
        Self {
            id,
            timestamp,
            status: ResponseStatus::Accepted,
            state: Some(state),
            message: None,
        }
    }

    pub fn rejected(id: u32, timestamp: u64, rejection: &IllegalTransition) -> Self {
        Self {
            id,
            timestamp,
            status: ResponseStatus::Rejected,
            state: Some(rejection.state),
            message: Some(rejection.to_string()),
        }
    }

    pub fn error(id: u32, timestamp: u64, message: &str) -> Self {
        Self {
            id,
            timestamp,
            status: ResponseStatus::Error,
            state: None,
            message: Some(message.to_string()),
        }
    }
}

/// JSON line codec with preallocated buffers for each message class.
#[derive(Debug)]
pub struct ProtocolHandler {
    command_buffer: CommandBuffer,
    response_buffer: ResponseBuffer,
    snapshot_buffer: SnapshotBuffer,
}

impl ProtocolHandler {
    pub fn new() -> Self {
        Self {
            command_buffer: ArrayString::new(),
            response_buffer: ArrayString::new(),
            snapshot_buffer: ArrayString::new(),
        }
    }

    pub fn parse_command(&mut self, json_str: &str) -> Result<OperatorCommand, ProtocolError> {
        if json_str.len() > MAX_COMMAND_SIZE {
            return Err(ProtocolError::MessageTooLarge);
        }
        self.command_buffer.clear();
        self.command_buffer.push_str(json_str);

        serde_json::from_str::<OperatorCommand>(json_str).map_err(|_| ProtocolError::InvalidJson)
    }

    pub fn serialize_response(
        &mut self,
        response: &CommandResponse,
    ) -> Result<&str, ProtocolError> {
        let json_str =
            serde_json::to_string(response).map_err(|_| ProtocolError::SerializationError)?;
        if json_str.len() > MAX_RESPONSE_SIZE {
            return Err(ProtocolError::MessageTooLarge);
        }

        self.response_buffer.clear();
        self.response_buffer.push_str(&json_str);
        Ok(&self.response_buffer)
    }

    pub fn serialize_snapshot(
        &mut self,
        snapshot: &StatusSnapshot,
    ) -> Result<&str, ProtocolError> {
        let json_str =
            serde_json::to_string(snapshot).map_err(|_| ProtocolError::SerializationError)?;
        if json_str.len() > MAX_SNAPSHOT_SIZE {
            return Err(ProtocolError::MessageTooLarge);
        }

        self.snapshot_buffer.clear();
        self.snapshot_buffer.push_str(&json_str);
        Ok(&self.snapshot_buffer)
    }
}

impl Default for ProtocolHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Invalid JSON format")]
    InvalidJson,
    #[error("Message exceeds buffer size")]
    MessageTooLarge,
    #[error("Serialization failed")]
    SerializationError,
}

/// Renders uptime seconds as `HH:MM:SS` for operator displays.
pub fn format_uptime(uptime_s: u64) -> String {
    let hours = uptime_s / 3_600;
    let minutes = (uptime_s % 3_600) / 60;
    let seconds = uptime_s % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Renders a record id in inventory-tag form, e.g. `INV-0042`.
pub fn format_record_id(id: RecordId) -> String {
    format!("INV-{:04}", id)
}
