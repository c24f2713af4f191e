//! Scripted hardware for tests and demos.
//!
//! Enabled by the `sim` feature (on by default). Neither simulator touches
//! real devices; both expose counters so tests can check that every
//! subscription and feed was released.

mod camera;
mod radio;

pub use camera::{ScriptedCamera, ScriptedFeed};
pub use radio::ScriptedRadio;
