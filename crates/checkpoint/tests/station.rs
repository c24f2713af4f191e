//! Integration tests for `CheckInStation` over simulated hardware.

use std::time::Duration;

use checkpoint::prelude::*;
use checkpoint::hardware::sim::{ScriptedCamera, ScriptedRadio};
use checkpoint::hardware::{Advertisement, SensorKind};
use checkpoint::protocol::LandmarkFrame;
use checkpoint::proximity::IBeacon;
use checkpoint::session::DEMO_CODE;
use tokio::sync::mpsc;

// =========================================================================
// Helpers
// =========================================================================

const STEP: Duration = Duration::from_millis(250);

/// Always answers with the same enrolled student.
struct FixedMatcher;

impl RemoteMatcher for FixedMatcher {
    async fn match_face(&self, _still: &[u8]) -> Result<MatchResponse, MatcherError> {
        MatchResponse::from_json(br#"{"verified":true,"name":"Grace Hopper","mis":"770001"}"#)
    }
}

fn beacon(rssi: i16, major: u16, minor: u16) -> Advertisement {
    Advertisement {
        rssi,
        manufacturer_data: vec![
            IBeacon {
                proximity_uuid: [0x42; 16],
                major,
                minor,
                measured_power: -59,
            }
            .encode(),
        ],
        timestamp_ms: 0,
    }
}

fn two_blinks() -> Vec<LandmarkFrame> {
    vec![
        LandmarkFrame::with_face(0.5, 0.5, 0),
        LandmarkFrame::with_face(0.1, 0.1, 100),
        LandmarkFrame::with_face(0.5, 0.5, 500),
        LandmarkFrame::with_face(0.1, 0.1, 600),
    ]
}

async fn until(
    updates: &mut mpsc::UnboundedReceiver<CheckInUpdate>,
    predicate: impl Fn(&CheckInUpdate) -> bool,
) -> CheckInUpdate {
    loop {
        let update = updates.recv().await.expect("actor stopped early");
        if predicate(&update) {
            return update;
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_station_check_in_then_close_attendance() {
    let station = CheckInStation::builder()
        .directory(BeaconDirectory::new().with_room(3, 301, "L-301"))
        .build(
            InMemoryRegistry::new(),
            ScriptedRadio::new().advertise(STEP, beacon(-66, 3, 301)),
            ScriptedCamera::new().with_frames(two_blinks()),
            FixedMatcher,
            InMemoryLedger::new(),
        );
    let issued = station
        .registry()
        .create_session("prof-1", "Operating Systems", LocationId::new("L-301"))
        .await
        .unwrap();

    let (attempt, mut updates) = station.begin();
    attempt.submit_code(issued.code.as_str()).await.unwrap();
    until(&mut updates, |u| {
        matches!(u, CheckInUpdate::AttendanceRecorded { .. })
    })
    .await;

    assert_eq!(station.attendance(&issued.id).await.unwrap().len(), 1);
    let cleared = station.close_attendance(&issued.id).await.unwrap();
    assert_eq!(cleared.total, 1);
    assert_eq!(cleared.final_list[0].display_name, "Grace Hopper");
    assert!(station.attendance(&issued.id).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_station_demo_bypass_resolves_without_registry() {
    let station = CheckInStation::builder()
        .config(CheckInConfig {
            bypass: BypassPolicy::DemoCode,
            ..Default::default()
        })
        .directory(BeaconDirectory::new().with_room(1, 101, "ROOM-101"))
        .build(
            InMemoryRegistry::new(),
            ScriptedRadio::new().advertise(STEP, beacon(-70, 1, 101)),
            ScriptedCamera::new().with_frames(two_blinks()),
            FixedMatcher,
            InMemoryLedger::new(),
        );

    let (attempt, mut updates) = station.begin();
    attempt.submit_code(DEMO_CODE).await.unwrap();

    let resolved = until(&mut updates, |u| {
        matches!(u, CheckInUpdate::SessionResolved { .. })
    })
    .await;
    let CheckInUpdate::SessionResolved { session } = resolved else {
        unreachable!()
    };
    assert_eq!(session.course_name, "Demo Session");
    assert!(station.registry().is_empty().await);

    until(&mut updates, |u| matches!(u, CheckInUpdate::Confirmed { .. })).await;
}

#[tokio::test(start_paused = true)]
async fn test_station_demo_code_without_bypass_is_not_found() {
    let station = CheckInStation::builder().build(
        InMemoryRegistry::new(),
        ScriptedRadio::new(),
        ScriptedCamera::new(),
        FixedMatcher,
        InMemoryLedger::new(),
    );

    let (attempt, mut updates) = station.begin();
    attempt.submit_code(DEMO_CODE).await.unwrap();

    assert_eq!(
        updates.recv().await,
        Some(CheckInUpdate::CodeRejected {
            reason: CodeRejection::NotFound
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_station_attempts_share_sensors() {
    let station = CheckInStation::builder()
        .directory(BeaconDirectory::new().with_room(3, 301, "L-301"))
        .build(
            InMemoryRegistry::new(),
            ScriptedRadio::new().advertise_rssi(STEP, -95),
            ScriptedCamera::new(),
            FixedMatcher,
            InMemoryLedger::new(),
        );
    let issued = station
        .registry()
        .create_session("prof-1", "Operating Systems", LocationId::new("L-301"))
        .await
        .unwrap();

    let (first, mut first_updates) = station.begin();
    first.submit_code(issued.code.as_str()).await.unwrap();
    until(&mut first_updates, |u| {
        matches!(u, CheckInUpdate::SignalWeak { .. })
    })
    .await;
    assert_eq!(station.arbiter().current(), Some(SensorKind::Radio));

    let (second, mut second_updates) = station.begin();
    second.submit_code(issued.code.as_str()).await.unwrap();
    let aborted = until(&mut second_updates, |u| {
        matches!(u, CheckInUpdate::Aborted { .. })
    })
    .await;

    assert!(matches!(
        aborted,
        CheckInUpdate::Aborted {
            reason: AbortReason::HardwareUnavailable { .. }
        }
    ));
    assert_eq!(first.status().await.unwrap().phase, CheckInPhase::Proximity);
}

#[test]
fn test_builder_validates_config() {
    let station = CheckInStation::builder()
        .config(CheckInConfig {
            max_frame_rate_hz: 240,
            ..Default::default()
        })
        .build(
            InMemoryRegistry::new(),
            ScriptedRadio::new(),
            ScriptedCamera::new(),
            FixedMatcher,
            InMemoryLedger::new(),
        );

    assert_eq!(station.config().max_frame_rate_hz, 30);
}

#[test]
fn test_config_roundtrips_through_json_codec() {
    let config = CheckInConfig {
        allow_manual_override: true,
        ..Default::default()
    };

    let bytes = JsonCodec.encode(&config).unwrap();
    let decoded: CheckInConfig = JsonCodec.decode(&bytes).unwrap();

    assert_eq!(decoded, config);
}
