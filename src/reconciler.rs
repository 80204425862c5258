//! `EntityReconciler`: identity-keyed mirror of the simulator's cars and
//! stoplights.
//!
//! Each apply call runs to completion before the next animator tick, so a
//! tick never observes a half-applied snapshot.  The reconciler is the only
//! owner of its animators; removing an identity disposes its animator.

use crate::animator::{CarAnimator, CarModel};
use crate::protocol::{CarPositions, StopLightRecord, StopLights};
use crate::types::{GridMapping, LightColor, LightDirection};
use glam::Vec3;
use log::{debug, warn};
use std::collections::{HashMap, HashSet, VecDeque};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// What a single apply call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// New identities that got an animator (or light).
    pub created: usize,
    /// Known identities that received a new target.
    pub updated: usize,
    /// Identities disposed and removed.
    pub removed: usize,
    /// Records dropped: empty identity, retired identity, or unknown on finish.
    pub ignored: usize,
}

impl std::fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "created={} updated={} removed={} ignored={}",
            self.created, self.updated, self.removed, self.ignored
        )
    }
}

// ---------------------------------------------------------------------------
// Stoplights
// ---------------------------------------------------------------------------

/// A placed stoplight.  Position and orientation are fixed at creation; only
/// the color changes afterwards.
#[derive(Debug, Clone)]
pub struct StopLight {
    id: String,
    direction: LightDirection,
    position: Vec3,
    rotation_y: f32,
    color: LightColor,
}

impl StopLight {
    /// Place a light from its first record.  Horizontal lights are shifted
    /// half a tile along X and turned a quarter turn about Y.
    pub fn place(record: &StopLightRecord, mapping: &GridMapping) -> Self {
        let mut position = mapping.to_world(record.x, record.y, record.z);
        let rotation_y = match record.direction {
            LightDirection::Horizontal => {
                position.x += mapping.half_tile();
                90.0
            }
            LightDirection::Vertical => 0.0,
        };

        Self {
            id: record.id.clone(),
            direction: record.direction,
            position,
            rotation_y,
            color: record.color,
        }
    }

    pub fn set_light_color(&mut self, color: LightColor) {
        self.color = color;
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn direction(&self) -> LightDirection {
        self.direction
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Orientation about +Y in degrees.
    pub fn rotation_y(&self) -> f32 {
        self.rotation_y
    }

    pub fn color(&self) -> LightColor {
        self.color
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct EntityReconciler {
    mapping: GridMapping,
    movement_duration: f32,
    model: CarModel,
    cars: HashMap<String, CarAnimator>,
    lights: HashMap<String, StopLight>,
    /// Identities removed by a finished report; later sightings are ignored.
    /// Bounded: the oldest entries are forgotten once `retired_capacity`
    /// is reached.
    retired: HashSet<String>,
    retired_order: VecDeque<String>,
    retired_capacity: usize,
}

impl EntityReconciler {
    /// Retired identities remembered by default.
    pub const DEFAULT_RETIRED_CAPACITY: usize = 4096;

    pub fn new(mapping: GridMapping, movement_duration: f32, model: CarModel) -> Self {
        Self {
            mapping,
            movement_duration,
            model,
            cars: HashMap::new(),
            lights: HashMap::new(),
            retired: HashSet::new(),
            retired_order: VecDeque::new(),
            retired_capacity: Self::DEFAULT_RETIRED_CAPACITY,
        }
    }

    /// Remember at most `capacity` retired identities (at least one).
    pub fn with_retired_capacity(mut self, capacity: usize) -> Self {
        self.retired_capacity = capacity.max(1);
        self.trim_retired();
        self
    }

    /// Duration handed to cars created from now on (the poll interval).
    pub fn set_movement_duration(&mut self, seconds: f32) {
        self.movement_duration = seconds;
    }

    pub fn mapping(&self) -> &GridMapping {
        &self.mapping
    }

    // -----------------------------------------------------------------------
    // Cars
    // -----------------------------------------------------------------------

    /// Create animators for new identities and retarget known ones.
    pub fn apply_update_snapshot(&mut self, snapshot: &CarPositions) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for record in &snapshot.positions {
            if record.id.is_empty() {
                warn!("Skipping car record with empty id");
                report.ignored += 1;
                continue;
            }
            if self.retired.contains(&record.id) {
                debug!("Ignoring position for finished car {}", record.id);
                report.ignored += 1;
                continue;
            }

            let pose = self.mapping.to_world(record.x, record.y, record.z);
            match self.cars.get_mut(&record.id) {
                Some(car) => {
                    car.set_next_waypoint(pose);
                    report.updated += 1;
                }
                None => {
                    let mut car = CarAnimator::new(record.id.clone(), &self.model);
                    car.set_movement_duration(self.movement_duration);
                    car.set_next_waypoint(pose);
                    debug!("Spawned car {} at {}", record.id, pose);
                    self.cars.insert(record.id.clone(), car);
                    report.created += 1;
                }
            }
        }

        debug!("Position snapshot applied: {}", report);
        report
    }

    /// Dispose and forget every known identity in `snapshot`.
    ///
    /// Unknown identities are ignored: a finish report may arrive before the
    /// car was ever seen.
    pub fn apply_finished_snapshot(&mut self, snapshot: &CarPositions) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for record in &snapshot.positions {
            match self.cars.remove(&record.id) {
                Some(mut car) => {
                    car.dispose();
                    self.retire(&record.id);
                    debug!("Removed finished car {}", record.id);
                    report.removed += 1;
                }
                None => report.ignored += 1,
            }
        }

        debug!("Finished snapshot applied: {}", report);
        report
    }

    // -----------------------------------------------------------------------
    // Stoplights
    // -----------------------------------------------------------------------

    /// Recolor known lights; place unseen ones.  Never moves a placed light.
    pub fn apply_light_snapshot(&mut self, snapshot: &StopLights) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for record in &snapshot.stop_lights {
            if record.id.is_empty() {
                warn!("Skipping stoplight record with empty id");
                report.ignored += 1;
                continue;
            }

            match self.lights.get_mut(&record.id) {
                Some(light) => {
                    light.set_light_color(record.color);
                    report.updated += 1;
                }
                None => {
                    let light = StopLight::place(record, &self.mapping);
                    debug!(
                        "Placed stoplight {} at {} ({:?})",
                        record.id,
                        light.position(),
                        record.direction
                    );
                    self.lights.insert(record.id.clone(), light);
                    report.created += 1;
                }
            }
        }

        debug!("Stoplight snapshot applied: {}", report);
        report
    }

    // -----------------------------------------------------------------------
    // Frame update
    // -----------------------------------------------------------------------

    /// Advance every car animator.
    pub fn tick(&mut self, dt: f32, time: f32) {
        for car in self.cars.values_mut() {
            car.tick(dt, time);
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn car(&self, id: &str) -> Option<&CarAnimator> {
        self.cars.get(id)
    }

    pub fn cars(&self) -> impl Iterator<Item = &CarAnimator> {
        self.cars.values()
    }

    pub fn light(&self, id: &str) -> Option<&StopLight> {
        self.lights.get(id)
    }

    pub fn lights(&self) -> impl Iterator<Item = &StopLight> {
        self.lights.values()
    }

    pub fn car_count(&self) -> usize {
        self.cars.len()
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn is_retired(&self, id: &str) -> bool {
        self.retired.contains(id)
    }

    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    fn retire(&mut self, id: &str) {
        if self.retired.insert(id.to_string()) {
            self.retired_order.push_back(id.to_string());
            self.trim_retired();
        }
    }

    fn trim_retired(&mut self) {
        while self.retired_order.len() > self.retired_capacity {
            if let Some(oldest) = self.retired_order.pop_front() {
                self.retired.remove(&oldest);
            }
        }
    }

    /// Dispose everything and forget retired identities.
    pub fn clear(&mut self) {
        for car in self.cars.values_mut() {
            car.dispose();
        }
        self.cars.clear();
        self.lights.clear();
        self.retired.clear();
        self.retired_order.clear();
    }
}

impl Default for EntityReconciler {
    fn default() -> Self {
        Self::new(
            GridMapping::default(),
            CarAnimator::DEFAULT_DURATION,
            CarModel::default(),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
