use roverctl::clock::ManualClock;
use roverctl::controller::{ControllerConfig, MissionController};
use roverctl::mission::{MissionCommand, MissionState};
use roverctl::sink::InstantSink;
use roverctl::telemetry::{Connectivity, LinkPolicy, TelemetryGenerator};

fn manual_controller(config: ControllerConfig) -> (MissionController, ManualClock) {
    let clock = ManualClock::new();
    let controller = MissionController::new_with_parts(
        config,
        Box::new(clock.clone()),
        Box::new(InstantSink::new()),
    );
    (controller, clock)
}

#[test]
fn test_uptime_follows_elapsed_time() {
    let mut generator = TelemetryGenerator::new(100.0, 0.1);

    assert_eq!(generator.on_tick(0, MissionState::Idle).uptime_s, 0);
    assert_eq!(generator.on_tick(5_000, MissionState::Idle).uptime_s, 5);
    assert_eq!(generator.on_tick(61_499, MissionState::Idle).uptime_s, 61);
}

#[test]
fn test_battery_drains_only_while_scanning() {
    let mut generator = TelemetryGenerator::new(100.0, 0.5);

    let idle = generator.on_tick(5_000, MissionState::Idle);
    assert!((idle.battery_percent - 100.0).abs() < 1e-3);

    let scanning = generator.on_tick(10_000, MissionState::Scanning);
    assert!((scanning.battery_percent - 99.5).abs() < 1e-3);

    let paused = generator.on_tick(15_000, MissionState::Paused);
    assert!((paused.battery_percent - 99.5).abs() < 1e-3);

    let returning = generator.on_tick(20_000, MissionState::ReturningToBase);
    assert!((returning.battery_percent - 99.5).abs() < 1e-3);
}

#[test]
fn test_battery_floors_at_zero() {
    let mut generator = TelemetryGenerator::new(100.0, 40.0);

    generator.on_tick(5_000, MissionState::Scanning);
    generator.on_tick(10_000, MissionState::Scanning);
    let frame = generator.on_tick(15_000, MissionState::Scanning);
    assert_eq!(frame.battery_percent, 0.0);

    // Floored, not negative, and it stays there
    let frame = generator.on_tick(20_000, MissionState::Scanning);
    assert_eq!(frame.battery_percent, 0.0);
}

#[test]
fn test_initial_battery_is_clamped_to_range() {
    let overcharged = TelemetryGenerator::new(250.0, 0.1);
    assert_eq!(overcharged.battery_percent(), 100.0);

    let depleted = TelemetryGenerator::new(-5.0, 0.1);
    assert_eq!(depleted.battery_percent(), 0.0);
}

#[test]
fn test_sequence_numbers_count_frames() {
    let mut generator = TelemetryGenerator::new(100.0, 0.1);

    let first = generator.on_tick(5_000, MissionState::Idle);
    let second = generator.on_tick(10_000, MissionState::Idle);
    let third = generator.on_tick(15_000, MissionState::Scanning);

    assert_eq!(second.sequence, first.sequence + 1);
    assert_eq!(third.sequence, second.sequence + 1);
}

#[test]
fn test_controller_emits_frames_on_its_interval() {
    let (mut controller, clock) = manual_controller(ControllerConfig::default());

    clock.advance(4_999);
    assert!(controller.tick().is_none());

    clock.advance(1);
    let snapshot = controller.tick().unwrap();
    assert_eq!(snapshot.telemetry.uptime_s, 5);

    // No second frame until the next boundary
    clock.advance(100);
    assert!(controller.tick().is_none());

    clock.advance(4_900);
    assert!(controller.tick().is_some());
}

#[test]
fn test_terminate_stops_drain_on_the_next_boundary() {
    let (mut controller, clock) = manual_controller(ControllerConfig::default());
    controller.issue_command(MissionCommand::Start).unwrap();

    clock.advance(5_000);
    let frame = controller.tick().unwrap();
    assert!((frame.telemetry.battery_percent - 99.9).abs() < 1e-3);

    clock.advance(5_000);
    let frame = controller.tick().unwrap();
    assert!((frame.telemetry.battery_percent - 99.8).abs() < 1e-3);

    controller.issue_command(MissionCommand::Terminate).unwrap();

    // Battery holds once the mission ends
    clock.advance(5_000);
    let frame = controller.tick().unwrap();
    assert_eq!(frame.mission_state, MissionState::Idle);
    assert!((frame.telemetry.battery_percent - 99.8).abs() < 1e-3);

    clock.advance(20_000);
    let frame = controller.tick().unwrap();
    assert!((frame.telemetry.battery_percent - 99.8).abs() < 1e-3);
}

#[test]
fn test_paused_rover_holds_charge() {
    let (mut controller, clock) = manual_controller(ControllerConfig::default());
    controller.issue_command(MissionCommand::Start).unwrap();

    clock.advance(5_000);
    controller.tick();
    controller.issue_command(MissionCommand::Pause).unwrap();

    clock.advance(30_000);
    let frame = controller.tick().unwrap();
    assert_eq!(frame.mission_state, MissionState::Paused);
    assert!((frame.telemetry.battery_percent - 99.9).abs() < 1e-3);
}

/// Degrades the link after a configurable point in the mission.
struct FadingLink {
    degrade_after_ms: u64,
}

impl LinkPolicy for FadingLink {
    fn classify(&mut self, elapsed_ms: u64, _state: MissionState) -> Connectivity {
        if elapsed_ms >= self.degrade_after_ms {
            Connectivity::Degraded
        } else {
            Connectivity::Connected
        }
    }
}

#[test]
fn test_injected_link_policy_classifies_frames() {
    let (mut controller, clock) = manual_controller(ControllerConfig::default());
    controller.set_link_policy(Box::new(FadingLink {
        degrade_after_ms: 8_000,
    }));

    clock.advance(5_000);
    let frame = controller.tick().unwrap();
    assert_eq!(frame.telemetry.connectivity, Connectivity::Connected);

    clock.advance(5_000);
    let frame = controller.tick().unwrap();
    assert_eq!(frame.telemetry.connectivity, Connectivity::Degraded);
}

#[test]
fn test_default_link_never_degrades() {
    let (mut controller, clock) = manual_controller(ControllerConfig::default());
    controller.issue_command(MissionCommand::Start).unwrap();

    for _ in 0..20 {
        clock.advance(5_000);
        let frame = controller.tick().unwrap();
        assert_eq!(frame.telemetry.connectivity, Connectivity::Connected);
    }
}
