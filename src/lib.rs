//! # Rover Mission Controller
//!
//! A warehouse rover mission controller library providing lifecycle command
//! processing, state-gated telemetry generation, and durable inventory scan
//! logging.
//!
//! ## Features
//!
//! - **Mission lifecycle**: Idle / Scanning / Paused / Returning-to-Base state
//!   machine with a strict transition table
//! - **Telemetry generation**: battery, connectivity, and uptime frames on a
//!   fixed interval, gated by mission state
//! - **Inventory scan logging**: append-only scan records with a
//!   Pending → Synced/Failed persistence status
//! - **Pluggable policies**: battery drain, link classification, and item
//!   selection are injectable; tests run against a manual clock
//! - **Operator surface**: JSON line protocol over TCP plus a colored CLI
//!
//! ## Quick Start
//!
//! ```rust
//! use roverctl::{MissionCommand, MissionController};
//!
//! // Create the controller; the clock starts with it
//! let mut controller = MissionController::new();
//!
//! // Begin a scan session
//! if let Ok(state) = controller.issue_command(MissionCommand::Start) {
//!     println!("Mission state: {}", state);
//! }
//!
//! // Drive the cooperative loop; telemetry frames appear on their interval
//! if let Some(snapshot) = controller.tick() {
//!     println!("Battery: {:.1}%", snapshot.telemetry.battery_percent);
//! }
//! ```
//!
//! ## Architecture
//!
//! The controller is organized into several key modules:
//!
//! - [`controller`] - Facade composing the parts; the public entry point
//! - [`mission`] - Lifecycle state machine and transition table
//! - [`telemetry`] - Telemetry frames and drain/link policies
//! - [`scanner`] - Interval-driven scan event generation
//! - [`scanlog`] - Append-only scan record store
//! - [`sink`] - Durable-store hand-off seam
//! - [`clock`] - Monotonic and manual time sources
//! - [`protocol`] - JSON wire types for the TCP surface

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

pub mod clock;
pub mod controller;
pub mod mission;
pub mod protocol;
pub mod scanlog;
pub mod scanner;
pub mod sink;
pub mod telemetry;

// Re-export main public types for convenience
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use controller::{
    ControllerConfig, ControllerError, ControllerState, MissionController, StatusSnapshot,
};
pub use mission::{IllegalTransition, MissionCommand, MissionState, StateChange};
pub use protocol::{CommandResponse, OperatorCommand, ProtocolHandler, ResponseStatus};
pub use scanlog::{RecordId, ScanLog, ScanLogError, ScanLogStats, ScanRecord, SyncStatus};
pub use scanner::{default_catalog, ItemPicker, LcgPicker, RoundRobinPicker};
pub use sink::{DropSink, FlakySink, InstantSink, ScanSink, SinkOutcome, SinkReport};
pub use telemetry::{
    Connectivity, DrainPolicy, FixedDrain, LinkPolicy, SteadyLink, TelemetrySnapshot,
};
