use crate::clock::{Clock, MonotonicClock};
use crate::mission::{
    IllegalTransition, MissionCommand, MissionMachine, MissionState, StateChange,
};
use crate::scanlog::{ScanLog, ScanRecord};
use crate::scanner::{default_catalog, ItemPicker, ScanGenerator, DEFAULT_SCAN_INTERVAL_MS};
use crate::sink::{InstantSink, ScanSink, SinkOutcome};
use crate::telemetry::{
    DrainPolicy, LinkPolicy, TelemetryGenerator, TelemetrySnapshot, DEFAULT_DRAIN_PCT_PER_TICK,
    DEFAULT_INITIAL_BATTERY_PCT, DEFAULT_TELEMETRY_INTERVAL_MS,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_SUBSCRIBERS: usize = 8;
pub const DEFAULT_RECENT_SCANS: usize = 5;

pub type StateChangeFn = Box<dyn FnMut(&StateChange) + Send>;

/// Static controller configuration, resolved once at construction.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub telemetry_interval_ms: u64,
    pub scan_interval_ms: u64,
    pub battery_drain_pct_per_tick: f32,
    pub initial_battery_percent: f32,
    pub item_catalog: Vec<String>,
    pub recent_scans: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            telemetry_interval_ms: DEFAULT_TELEMETRY_INTERVAL_MS,
            scan_interval_ms: DEFAULT_SCAN_INTERVAL_MS,
            battery_drain_pct_per_tick: DEFAULT_DRAIN_PCT_PER_TICK,
            initial_battery_percent: DEFAULT_INITIAL_BATTERY_PCT,
            item_catalog: default_catalog(),
            recent_scans: DEFAULT_RECENT_SCANS,
        }
    }
}

/// Point-in-time view handed to observers: the last telemetry frame, the live
/// mission state, and the most recent scan records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub telemetry: TelemetrySnapshot,
    pub mission_state: MissionState,
    pub current_scan: Option<String>,
    pub total_scanned: u64,
    pub recent_scans: Vec<ScanRecord>,
}

/// Controller bookkeeping exposed for operator displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerState {
    pub running: bool,
    pub uptime_s: u64,
    pub commands_accepted: u32,
    pub commands_rejected: u32,
    pub telemetry_frames: u32,
    pub scans_recorded: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("subscriber table full")]
    SubscriberLimit,
}

/// The single entry point external collaborators call.
///
/// Composes the state machine, both generators, the scan log, and the sink
/// hand-off. Every mutating method takes `&mut self`, so one owner (or one
/// mutex) serializes commands against tick processing.
pub struct MissionController {
    config: ControllerConfig,
    clock: Box<dyn Clock>,
    epoch_ms: u64,
    machine: MissionMachine,
    telemetry: TelemetryGenerator,
    scanner: ScanGenerator,
    log: ScanLog,
    sink: Box<dyn ScanSink>,
    subscribers: heapless::Vec<StateChangeFn, MAX_SUBSCRIBERS>,
    last_frame: TelemetrySnapshot,
    next_telemetry_ms: u64,
    current_scan: Option<String>,
    running: bool,
    commands_accepted: u32,
    commands_rejected: u32,
}

impl MissionController {
    pub fn new() -> Self {
        Self::new_with_config(ControllerConfig::default())
    }

    pub fn new_with_config(config: ControllerConfig) -> Self {
        Self::new_with_parts(
            config,
            Box::new(MonotonicClock::new()),
            Box::new(InstantSink::new()),
        )
    }

    /// Full injection, for tests and hosts that bring their own clock or
    /// durable store.
    pub fn new_with_parts(
        mut config: ControllerConfig,
        clock: Box<dyn Clock>,
        sink: Box<dyn ScanSink>,
    ) -> Self {
        if config.item_catalog.is_empty() {
            config.item_catalog = default_catalog();
        }
        config.telemetry_interval_ms = config.telemetry_interval_ms.max(1);

        let epoch_ms = clock.now_ms();
        let mut telemetry = TelemetryGenerator::new(
            config.initial_battery_percent,
            config.battery_drain_pct_per_tick,
        );
        let scanner = ScanGenerator::new(config.scan_interval_ms, config.item_catalog.clone());

        // Frame zero, so a snapshot is available before the first tick.
        let last_frame = telemetry.on_tick(0, MissionState::Idle);
        let next_telemetry_ms = config.telemetry_interval_ms;

        Self {
            config,
            clock,
            epoch_ms,
            machine: MissionMachine::new(),
            telemetry,
            scanner,
            log: ScanLog::new(),
            sink,
            subscribers: heapless::Vec::new(),
            last_frame,
            next_telemetry_ms,
            current_scan: None,
            running: true,
            commands_accepted: 0,
            commands_rejected: 0,
        }
    }

    /// Validates and applies one operator command. Subscribers observe the
    /// transition before this returns; rejections change nothing and notify
    /// no one.
    pub fn issue_command(
        &mut self,
        command: MissionCommand,
    ) -> Result<MissionState, IllegalTransition> {
        let now_ms = self.elapsed_ms();
        let change = match self.machine.issue(command, now_ms) {
            Ok(change) => change,
            Err(rejected) => {
                self.commands_rejected = self.commands_rejected.wrapping_add(1);
                return Err(rejected);
            }
        };
        self.commands_accepted = self.commands_accepted.wrapping_add(1);

        match change.current {
            MissionState::Scanning => self.scanner.arm(now_ms),
            MissionState::Paused => self.scanner.disarm(),
            MissionState::Idle | MissionState::ReturningToBase => {
                self.scanner.disarm();
                self.current_scan = None;
            }
        }

        self.notify(&change);
        Ok(change.current)
    }

    /// One pass of the cooperative loop: apply sink reports, emit any due
    /// scan records, and produce a telemetry frame when its interval has
    /// elapsed. Returns the refreshed snapshot exactly when a frame was
    /// produced. After `shutdown` this is a no-op.
    pub fn tick(&mut self) -> Option<StatusSnapshot> {
        if !self.running {
            return None;
        }

        let now_ms = self.elapsed_ms();
        self.apply_sink_reports();
        self.generate_scans(now_ms);

        if now_ms < self.next_telemetry_ms {
            return None;
        }
        while self.next_telemetry_ms <= now_ms {
            self.next_telemetry_ms += self.config.telemetry_interval_ms;
        }

        self.last_frame = self.telemetry.on_tick(now_ms, self.machine.state());
        Some(self.snapshot())
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            telemetry: self.last_frame,
            mission_state: self.machine.state(),
            current_scan: self.current_scan.clone(),
            total_scanned: self.log.len() as u64,
            recent_scans: self.log.recent(self.config.recent_scans),
        }
    }

    /// Registers a callback for accepted transitions. Callbacks receive only
    /// the change itself, so delivery cannot re-enter the controller.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&StateChange) + Send + 'static,
    ) -> Result<(), ControllerError> {
        self.subscribers
            .push(Box::new(callback))
            .map_err(|_| ControllerError::SubscriberLimit)
    }

    /// Stops tick processing and scan generation. Sink hand-offs that have
    /// not reported yet stay wherever the sink left them; no flush is
    /// attempted.
    pub fn shutdown(&mut self) {
        self.running = false;
        self.scanner.disarm();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn mission_state(&self) -> MissionState {
        self.machine.state()
    }

    pub fn current_scan(&self) -> Option<&str> {
        self.current_scan.as_deref()
    }

    pub fn scan_log(&self) -> &ScanLog {
        &self.log
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn uptime_s(&self) -> u64 {
        self.elapsed_ms() / 1_000
    }

    pub fn controller_state(&self) -> ControllerState {
        ControllerState {
            running: self.running,
            uptime_s: self.elapsed_ms() / 1_000,
            commands_accepted: self.commands_accepted,
            commands_rejected: self.commands_rejected,
            telemetry_frames: self.last_frame.sequence,
            scans_recorded: self.log.len() as u32,
        }
    }

    pub fn set_item_picker(&mut self, picker: Box<dyn ItemPicker>) {
        self.scanner.set_picker(picker);
    }

    pub fn set_drain_policy(&mut self, policy: Box<dyn DrainPolicy>) {
        self.telemetry.set_drain_policy(policy);
    }

    pub fn set_link_policy(&mut self, policy: Box<dyn LinkPolicy>) {
        self.telemetry.set_link_policy(policy);
    }

    fn elapsed_ms(&self) -> u64 {
        self.clock.now_ms().saturating_sub(self.epoch_ms)
    }

    fn generate_scans(&mut self, now_ms: u64) {
        if self.machine.state() != MissionState::Scanning {
            return;
        }
        debug_assert!(self.scanner.is_armed());

        let session = self.machine.scan_session();
        for event in self.scanner.poll(now_ms) {
            let id = self.log.append(&event.item_label, session, event.at_ms);
            if let Some(record) = self.log.get(id) {
                self.sink.submit(record);
            }
            self.current_scan = Some(event.item_label);
        }
    }

    fn apply_sink_reports(&mut self) {
        for report in self.sink.poll_reports() {
            let applied = match report.outcome {
                SinkOutcome::Synced => self.log.mark_synced(report.record_id),
                SinkOutcome::Failed(reason) => self.log.mark_failed(report.record_id, &reason),
            };
            // A sink may only resolve ids it was handed, exactly once.
            debug_assert!(applied.is_ok());
            let _ = applied;
        }
    }

    fn notify(&mut self, change: &StateChange) {
        for subscriber in &mut self.subscribers {
            subscriber(change);
        }
    }
}

impl Default for MissionController {
    fn default() -> Self {
        Self::new()
    }
}
