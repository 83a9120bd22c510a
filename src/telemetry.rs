use crate::mission::MissionState;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TELEMETRY_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_DRAIN_PCT_PER_TICK: f32 = 0.1;
pub const DEFAULT_INITIAL_BATTERY_PCT: f32 = 100.0;

/// Link quality as reported to observers. The default policy never leaves
/// `Connected`; the other variants are reachable only through a custom
/// [`LinkPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connectivity {
    Connected,
    Degraded,
    Disconnected,
}

impl Connectivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connectivity::Connected => "Connected",
            Connectivity::Degraded => "Degraded",
            Connectivity::Disconnected => "Disconnected",
        }
    }
}

impl core::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One telemetry frame. Recomputed whole on every telemetry tick, never
/// mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub sequence: u32,
    pub battery_percent: f32,
    pub connectivity: Connectivity,
    pub uptime_s: u64,
    pub mission_state: MissionState,
}

/// Battery consumption per telemetry tick, in percentage points.
pub trait DrainPolicy: Send {
    fn drain_pct(&mut self, dt_ms: u64, state: MissionState) -> f32;
}

/// Fixed consumption per tick while the rover is actively scanning; no draw
/// otherwise.
#[derive(Debug, Clone, Copy)]
pub struct FixedDrain {
    pct_per_tick: f32,
}

impl FixedDrain {
    pub fn new(pct_per_tick: f32) -> Self {
        Self { pct_per_tick }
    }
}

impl DrainPolicy for FixedDrain {
    fn drain_pct(&mut self, _dt_ms: u64, state: MissionState) -> f32 {
        if state == MissionState::Scanning {
            self.pct_per_tick
        } else {
            0.0
        }
    }
}

/// Link classification policy.
pub trait LinkPolicy: Send {
    fn classify(&mut self, elapsed_ms: u64, state: MissionState) -> Connectivity;
}

/// Always reports a healthy link.
#[derive(Debug, Clone, Copy, Default)]
pub struct SteadyLink;

impl LinkPolicy for SteadyLink {
    fn classify(&mut self, _elapsed_ms: u64, _state: MissionState) -> Connectivity {
        Connectivity::Connected
    }
}

/// Produces telemetry frames from elapsed mission time and the current state.
///
/// Total: every call to [`TelemetryGenerator::on_tick`] yields a fully
/// populated frame, whatever the state. Battery level is clamped to [0, 100]
/// and only falls while scanning.
pub struct TelemetryGenerator {
    battery_percent: f32,
    sequence: u32,
    last_tick_ms: u64,
    drain: Box<dyn DrainPolicy>,
    link: Box<dyn LinkPolicy>,
}

impl TelemetryGenerator {
    pub fn new(initial_battery_pct: f32, drain_pct_per_tick: f32) -> Self {
        Self::with_policies(
            initial_battery_pct,
            Box::new(FixedDrain::new(drain_pct_per_tick)),
            Box::new(SteadyLink),
        )
    }

    pub fn with_policies(
        initial_battery_pct: f32,
        drain: Box<dyn DrainPolicy>,
        link: Box<dyn LinkPolicy>,
    ) -> Self {
        Self {
            battery_percent: initial_battery_pct.clamp(0.0, 100.0),
            sequence: 0,
            last_tick_ms: 0,
            drain,
            link,
        }
    }

    pub fn set_drain_policy(&mut self, drain: Box<dyn DrainPolicy>) {
        self.drain = drain;
    }

    pub fn set_link_policy(&mut self, link: Box<dyn LinkPolicy>) {
        self.link = link;
    }

    pub fn battery_percent(&self) -> f32 {
        self.battery_percent
    }

    /// Produces the next frame at `elapsed_ms` of mission time.
    pub fn on_tick(&mut self, elapsed_ms: u64, state: MissionState) -> TelemetrySnapshot {
        let dt_ms = elapsed_ms.saturating_sub(self.last_tick_ms);
        self.last_tick_ms = elapsed_ms;

        let drained = self.drain.drain_pct(dt_ms, state).max(0.0);
        self.battery_percent = (self.battery_percent - drained).clamp(0.0, 100.0);
        debug_assert!((0.0..=100.0).contains(&self.battery_percent));

        self.sequence = self.sequence.wrapping_add(1);

        TelemetrySnapshot {
            sequence: self.sequence,
            battery_percent: self.battery_percent,
            connectivity: self.link.classify(elapsed_ms, state),
            uptime_s: elapsed_ms / 1_000,
            mission_state: state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_is_total_in_every_state() {
        let mut generator = TelemetryGenerator::new(100.0, 0.1);
        let states = [
            MissionState::Idle,
            MissionState::Scanning,
            MissionState::Paused,
            MissionState::ReturningToBase,
        ];

        for (i, state) in states.iter().enumerate() {
            let frame = generator.on_tick(i as u64 * 5_000, *state);
            assert_eq!(frame.mission_state, *state);
            assert_eq!(frame.connectivity, Connectivity::Connected);
            assert!((0.0..=100.0).contains(&frame.battery_percent));
            assert_eq!(frame.sequence, i as u32 + 1);
        }
    }

    #[test]
    fn test_drain_applies_only_while_scanning() {
        let mut generator = TelemetryGenerator::new(50.0, 0.1);

        let frame = generator.on_tick(5_000, MissionState::Idle);
        assert!((frame.battery_percent - 50.0).abs() < f32::EPSILON);

        let frame = generator.on_tick(10_000, MissionState::Scanning);
        assert!((frame.battery_percent - 49.9).abs() < 0.0001);

        let frame = generator.on_tick(15_000, MissionState::Paused);
        assert!((frame.battery_percent - 49.9).abs() < 0.0001);

        let frame = generator.on_tick(20_000, MissionState::ReturningToBase);
        assert!((frame.battery_percent - 49.9).abs() < 0.0001);
    }

    #[test]
    fn test_battery_floors_at_zero() {
        let mut generator = TelemetryGenerator::new(0.25, 0.1);
        for i in 1..=10 {
            let frame = generator.on_tick(i * 5_000, MissionState::Scanning);
            assert!(frame.battery_percent >= 0.0);
        }
        assert!(generator.battery_percent().abs() < f32::EPSILON);
    }

    #[test]
    fn test_initial_level_is_clamped() {
        let generator = TelemetryGenerator::new(250.0, 0.1);
        assert!((generator.battery_percent() - 100.0).abs() < f32::EPSILON);

        let generator = TelemetryGenerator::new(-5.0, 0.1);
        assert!(generator.battery_percent().abs() < f32::EPSILON);
    }

    #[test]
    fn test_uptime_tracks_elapsed_time() {
        let mut generator = TelemetryGenerator::new(100.0, 0.1);
        assert_eq!(generator.on_tick(0, MissionState::Idle).uptime_s, 0);
        assert_eq!(generator.on_tick(5_000, MissionState::Idle).uptime_s, 5);
        assert_eq!(generator.on_tick(65_400, MissionState::Idle).uptime_s, 65);
    }

    struct FlappingLink {
        calls: u32,
    }

    impl LinkPolicy for FlappingLink {
        fn classify(&mut self, _elapsed_ms: u64, _state: MissionState) -> Connectivity {
            self.calls += 1;
            if self.calls % 2 == 0 {
                Connectivity::Degraded
            } else {
                Connectivity::Connected
            }
        }
    }

    #[test]
    fn test_link_policy_is_injectable() {
        let mut generator = TelemetryGenerator::with_policies(
            100.0,
            Box::new(FixedDrain::new(0.1)),
            Box::new(FlappingLink { calls: 0 }),
        );

        let first = generator.on_tick(5_000, MissionState::Idle);
        let second = generator.on_tick(10_000, MissionState::Idle);
        assert_eq!(first.connectivity, Connectivity::Connected);
        assert_eq!(second.connectivity, Connectivity::Degraded);
    }

    struct MeteredDrain;

    impl DrainPolicy for MeteredDrain {
        fn drain_pct(&mut self, dt_ms: u64, state: MissionState) -> f32 {
            if state == MissionState::Scanning {
                dt_ms as f32 / 1_000.0 * 0.02
            } else {
                0.0
            }
        }
    }

    #[test]
    fn test_drain_policy_sees_elapsed_interval() {
        let mut generator =
            TelemetryGenerator::with_policies(100.0, Box::new(MeteredDrain), Box::new(SteadyLink));

        // 10 s at 0.02 %/s.
        let frame = generator.on_tick(10_000, MissionState::Scanning);
        assert!((frame.battery_percent - 99.8).abs() < 0.0001);
    }
}
