//! Core viewer types shared across all modules.

use glam::Vec3;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Grid mapping
// ---------------------------------------------------------------------------

/// Converts simulator grid cells into world-space positions.
///
/// The simulator reports integer-ish cell coordinates.  The static city
/// layout is built one tile per cell, shifted one tile back on the depth
/// axis, so every remote position is scaled and offset the same way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMapping {
    pub tile_size: f32,
}

impl GridMapping {
    pub fn new(tile_size: f32) -> Self {
        Self { tile_size }
    }

    /// `(x, y, z)` in cells → world position.  `y` is passed through unscaled.
    pub fn to_world(&self, x: f32, y: f32, z: f32) -> Vec3 {
        Vec3::new(
            x * self.tile_size,
            y,
            z * self.tile_size - self.tile_size,
        )
    }

    /// Half a tile, used for the horizontal stoplight shift.
    pub fn half_tile(&self) -> f32 {
        self.tile_size / 2.0
    }
}

impl Default for GridMapping {
    fn default() -> Self {
        Self::new(10.0)
    }
}

// ---------------------------------------------------------------------------
// Stoplights
// ---------------------------------------------------------------------------

/// Stoplight color as reported by the simulator.
///
/// Anything other than `"red"` is displayed as green.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "snake_case")]
pub enum LightColor {
    Red,
    Green,
}

impl LightColor {
    /// Linear RGB used by the renderer.
    pub fn rgb(self) -> [f32; 3] {
        match self {
            LightColor::Red => [1.0, 0.0, 0.0],
            LightColor::Green => [0.0, 1.0, 0.0],
        }
    }
}

impl From<String> for LightColor {
    fn from(value: String) -> Self {
        LightColor::from(value.as_str())
    }
}

impl From<&str> for LightColor {
    fn from(value: &str) -> Self {
        if value == "red" {
            LightColor::Red
        } else {
            LightColor::Green
        }
    }
}

impl std::fmt::Display for LightColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LightColor::Red => write!(f, "red"),
            LightColor::Green => write!(f, "green"),
        }
    }
}

/// Which way a stoplight faces.  Fixed when the light is first placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "snake_case")]
pub enum LightDirection {
    Horizontal,
    Vertical,
}

impl From<String> for LightDirection {
    fn from(value: String) -> Self {
        if value == "horizontal" {
            LightDirection::Horizontal
        } else {
            LightDirection::Vertical
        }
    }
}

// ---------------------------------------------------------------------------
// Stats & config
// ---------------------------------------------------------------------------

/// Counters maintained by the sync loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Poll cycles started (the handshake is not counted).
    pub cycles: u64,
    /// Requests that failed to complete or returned a non-success status.
    pub transport_failures: u64,
    /// Responses that did not parse into the expected shape.
    pub malformed_responses: u64,
    /// Snapshots handed to the reconciler.
    pub snapshots_applied: u64,
    /// Whether the `/init` handshake succeeded.
    pub handshake_ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Base URL of the simulator HTTP server.
    pub server_url: String,
    /// Seconds between poll cycles.  Also the per-segment movement duration.
    pub poll_interval_secs: f32,
    /// World units per grid cell.
    pub tile_size: f32,
    /// Simulator steps between car spawns (`timeToSpawn`).
    pub spawn_interval: u32,
    /// Cars spawned per spawn step (`spawnAmount`, max 4).
    pub spawn_amount: u32,
    /// Host frame rate used by the headless viewer.
    pub frame_rate_hz: f32,
    /// Wheel spin rate in degrees per second.
    pub angular_velocity: f32,
    /// Optional city layout file (one symbol per cell).
    pub layout_path: Option<String>,
    /// Seed for deterministic building heights.
    pub world_seed: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8585".into(),
            poll_interval_secs: 1.0,
            tile_size: 10.0,
            spawn_interval: 1,
            spawn_amount: 4,
            frame_rate_hz: 60.0,
            angular_velocity: 90.0,
            layout_path: None,
            world_seed: 42,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
