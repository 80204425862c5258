//! Simulator HTTP wire protocol.
//!
//! This module owns **every payload that crosses the HTTP boundary** between
//! the viewer and the traffic simulator.
//!
//! ## Endpoints
//!
//! | Endpoint           | Method | Body / response                        |
//! |--------------------|--------|----------------------------------------|
//! | `/init`            | POST   | form: `timeToSpawn`, `spawnAmount`     |
//! | `/update`          | GET    | advances the simulation, body ignored  |
//! | `/carPositions`    | GET    | [`CarPositions`]                       |
//! | `/finishedCars`    | GET    | [`CarPositions`] (identities to remove) |
//! | `/stopLightStatus` | GET    | [`StopLights`]                         |
//!
//! ## Design rules
//!
//! 1. Positions are grid cells; [`crate::types::GridMapping`] converts them.
//! 2. Membership and identity matter, record order does not.
//! 3. Unknown color / direction strings degrade to green / vertical.

use crate::types::{LightColor, LightDirection};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Cars  (GET /carPositions, GET /finishedCars)
// ---------------------------------------------------------------------------

/// One car as reported by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarRecord {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl CarRecord {
    pub fn new(id: impl Into<String>, x: f32, y: f32, z: f32) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            z,
        }
    }
}

/// Snapshot of car records.
///
/// The finished-cars endpoint has been served under both `positions` and
/// `finishedCars`; either key is accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarPositions {
    #[serde(alias = "finishedCars", default)]
    pub positions: Vec<CarRecord>,
}

impl CarPositions {
    pub fn new(positions: Vec<CarRecord>) -> Self {
        Self { positions }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Stoplights  (GET /stopLightStatus)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopLightRecord {
    pub id: String,
    pub color: LightColor,
    pub direction: LightDirection,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopLights {
    #[serde(rename = "stopLights", default)]
    pub stop_lights: Vec<StopLightRecord>,
}

impl StopLights {
    pub fn new(stop_lights: Vec<StopLightRecord>) -> Self {
        Self { stop_lights }
    }
}

// ---------------------------------------------------------------------------
// Handshake  (POST /init)
// ---------------------------------------------------------------------------

/// Spawn-rate parameters sent once before the first poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitParams {
    /// Simulator steps between spawns.
    pub time_to_spawn: u32,
    /// Cars spawned per spawn step.
    pub spawn_amount: u32,
}

impl InitParams {
    /// Form fields in the order the server reads them.
    pub fn form_fields(&self) -> [(&'static str, String); 2] {
        [
            (fields::TIME_TO_SPAWN, self.time_to_spawn.to_string()),
            (fields::SPAWN_AMOUNT, self.spawn_amount.to_string()),
        ]
    }
}

impl Default for InitParams {
    fn default() -> Self {
        Self {
            time_to_spawn: 1,
            spawn_amount: 4,
        }
    }
}

pub mod fields {
    pub const TIME_TO_SPAWN: &str = "timeToSpawn";
    pub const SPAWN_AMOUNT: &str = "spawnAmount";
}

// ---------------------------------------------------------------------------
// Endpoint helpers
// ---------------------------------------------------------------------------

/// All simulator endpoints, as constants.
pub mod endpoints {
    pub const INIT: &str = "/init";
    pub const UPDATE: &str = "/update";
    pub const CAR_POSITIONS: &str = "/carPositions";
    pub const FINISHED_CARS: &str = "/finishedCars";
    pub const STOP_LIGHT_STATUS: &str = "/stopLightStatus";
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
