//! A scripted classroom: one instructor opens a session, one student
//! checks in at a simulated kiosk, and every update is printed as a JSON
//! line.
//!
//! Set `CHECKPOINT_CONFIG` to a JSON file to override the attempt config,
//! and `RUST_LOG` to change log verbosity.

use std::time::Duration;

use checkpoint::prelude::*;
use checkpoint::proximity::IBeacon;
use checkpoint::protocol::LandmarkFrame;
use checkpoint_hardware::Advertisement;
use checkpoint_hardware::sim::{ScriptedCamera, ScriptedRadio};

const ROOM: &str = "C-101";
const ROOM_MAJOR: u16 = 1;
const ROOM_MINOR: u16 = 101;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Recognises every still as the same enrolled student.
struct FrontDeskMatcher;

impl RemoteMatcher for FrontDeskMatcher {
    async fn match_face(&self, still: &[u8]) -> Result<MatchResponse, MatcherError> {
        tracing::debug!(bytes = still.len(), "matching still");
        Ok(MatchResponse {
            verified: true,
            name: Some("Ada Lovelace".into()),
            mis: Some("112233".into()),
            distance: Some(0.31),
            ..Default::default()
        })
    }
}

fn classroom_beacon(rssi: i16) -> Advertisement {
    let frame = IBeacon {
        proximity_uuid: [0x42; 16],
        major: ROOM_MAJOR,
        minor: ROOM_MINOR,
        measured_power: -59,
    };
    Advertisement {
        rssi,
        manufacturer_data: vec![frame.encode()],
        timestamp_ms: 0,
    }
}

/// A student who looks at the camera and blinks twice.
fn student_frames() -> Vec<LandmarkFrame> {
    vec![
        LandmarkFrame::no_face(0),
        LandmarkFrame::with_face(0.1, 0.1, 50),
        LandmarkFrame::with_face(0.5, 0.5, 100),
        LandmarkFrame::with_face(0.1, 0.1, 200),
        LandmarkFrame::with_face(0.5, 0.5, 600),
        LandmarkFrame::with_face(0.1, 0.1, 700),
    ]
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

fn load_config() -> Result<CheckInConfig, Box<dyn std::error::Error>> {
    match std::env::var_os("CHECKPOINT_CONFIG") {
        Some(path) => {
            let bytes = std::fs::read(&path)?;
            tracing::info!(path = ?path, "loaded check-in config");
            Ok(JsonCodec.decode(&bytes)?)
        }
        None => Ok(CheckInConfig::default()),
    }
}

/// Runs one check-in and returns the closed attendance list.
async fn run(config: CheckInConfig) -> Result<ClearedLedger, Box<dyn std::error::Error>> {
    let station = CheckInStation::builder()
        .config(config)
        .directory(BeaconDirectory::new().with_room(ROOM_MAJOR, ROOM_MINOR, ROOM))
        .build(
            InMemoryRegistry::new(),
            ScriptedRadio::new()
                .advertise_rssi(Duration::from_millis(300), -97)
                .advertise(Duration::from_millis(300), classroom_beacon(-64)),
            ScriptedCamera::new().with_frames(student_frames()),
            FrontDeskMatcher,
            InMemoryLedger::new(),
        );

    let issued = station
        .registry()
        .create_session("prof-babbage", "Analytical Engines 101", LocationId::new(ROOM))
        .await?;
    tracing::info!(code = %issued.code, course = "Analytical Engines 101", "session open");

    let (attempt, mut updates) = station.begin();
    attempt.submit_code(issued.code.as_str()).await?;

    while let Some(update) = updates.recv().await {
        println!("{}", serde_json::to_string(&update)?);
        match update {
            CheckInUpdate::AttendanceRecorded { .. } | CheckInUpdate::Aborted { .. } => break,
            CheckInUpdate::Notice { message, .. } => {
                tracing::warn!(%message, "attempt stalled, giving up");
                break;
            }
            _ => {}
        }
    }

    Ok(station.close_attendance(&issued.id).await?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cleared = run(load_config()?).await?;
    println!("{}", serde_json::to_string(&cleared)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_run_records_student() {
        let cleared = run(CheckInConfig::default()).await.unwrap();

        assert_eq!(cleared.total, 1);
        assert_eq!(cleared.final_list[0].display_name, "Ada Lovelace");
        assert_eq!(cleared.final_list[0].registration_id.as_str(), "112233");
    }
}
