//! Car pose animation: interpolates one entity between waypoints and
//! rewrites its body and wheel geometry every tick.
//!
//! ```text
//! Idle ──set_next_waypoint──▶ Animating ──elapsed ≥ duration──▶ Settled
//!                                ▲                                  │
//!                                └──────── set_next_waypoint ───────┘
//! ```

use crate::mesh::{DeformableMesh, Mesh};
use crate::pose::{self, rotation, translation_to, Axis};
use glam::{Mat4, Vec3};

/// Every car carries exactly this many wheels.
pub const WHEEL_COUNT: usize = 4;

// ---------------------------------------------------------------------------
// Car model
// ---------------------------------------------------------------------------

/// Geometry and wheel layout used to build a [`CarAnimator`].
///
/// The animator takes its own copy of every mesh; nothing is shared.
#[derive(Debug, Clone)]
pub struct CarModel {
    pub body: Mesh,
    pub wheel: Mesh,
    /// Wheel axle centres relative to the car origin.
    pub wheel_pivots: [Vec3; WHEEL_COUNT],
    /// Wheel spin in degrees per second of global clock.
    pub angular_velocity: f32,
}

impl CarModel {
    pub fn with_angular_velocity(mut self, degrees_per_second: f32) -> Self {
        self.angular_velocity = degrees_per_second;
        self
    }
}

impl Default for CarModel {
    fn default() -> Self {
        Self {
            body: Mesh::cuboid(Vec3::new(0.0, 0.9, 0.0), Vec3::new(0.9, 0.5, 2.0)),
            wheel: Mesh::wheel(0.35, 0.15, 12),
            wheel_pivots: [
                Vec3::new(-0.9, 0.35, 1.3),
                Vec3::new(0.9, 0.35, 1.3),
                Vec3::new(-0.9, 0.35, -1.3),
                Vec3::new(0.9, 0.35, -1.3),
            ],
            angular_velocity: 90.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Wheels
// ---------------------------------------------------------------------------

/// One wheel: its own geometry, spun about its local axle.
///
/// The host places the wheel's anchor at `pivot` once, when the car is
/// created.  Working vertices are relative to that anchor; use
/// [`WheelSubEntity::world_vertices`] for absolute positions.
#[derive(Debug, Clone)]
pub struct WheelSubEntity {
    pivot: Vec3,
    mesh: DeformableMesh,
}

impl WheelSubEntity {
    fn new(pivot: Vec3, base: Mesh) -> Self {
        Self {
            pivot,
            mesh: DeformableMesh::new(base),
        }
    }

    pub fn pivot(&self) -> Vec3 {
        self.pivot
    }

    pub fn mesh(&self) -> &DeformableMesh {
        &self.mesh
    }

    pub fn world_vertices(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.mesh.vertices().iter().map(move |v| *v + self.pivot)
    }

    /// `T(position) · T(-pivot) · R_y(heading) · T(pivot) · spin`
    fn pose(&mut self, position: Vec3, heading: f32, spin: &Mat4) {
        let transform = translation_to(position)
            * translation_to(-self.pivot)
            * rotation(heading, Axis::Y)
            * translation_to(self.pivot)
            * *spin;
        self.mesh.apply(&transform);
    }
}

// ---------------------------------------------------------------------------
// Animator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    /// No waypoint yet.
    Idle,
    /// Moving from `from` to `to`.
    Animating,
    /// Reached `to`; holds the pose until the next waypoint.
    Settled,
}

/// Owns one car's geometry and its motion between two waypoints.
#[derive(Debug, Clone)]
pub struct CarAnimator {
    id: String,
    body: DeformableMesh,
    wheels: Vec<WheelSubEntity>,
    angular_velocity: f32,
    from: Vec3,
    to: Vec3,
    elapsed: f32,
    /// Denominator of the segment in flight.
    duration: f32,
    /// Takes effect on the next waypoint.
    next_duration: f32,
    heading: f32,
    has_waypoint: bool,
    state: AnimationState,
    disposed: bool,
}

impl CarAnimator {
    pub const DEFAULT_DURATION: f32 = 1.0;

    pub fn new(id: impl Into<String>, model: &CarModel) -> Self {
        let wheels = model
            .wheel_pivots
            .iter()
            .map(|pivot| WheelSubEntity::new(*pivot, model.wheel.clone()))
            .collect();

        Self {
            id: id.into(),
            body: DeformableMesh::new(model.body.clone()),
            wheels,
            angular_velocity: model.angular_velocity,
            from: Vec3::ZERO,
            to: Vec3::ZERO,
            elapsed: 0.0,
            duration: Self::DEFAULT_DURATION,
            next_duration: Self::DEFAULT_DURATION,
            heading: 0.0,
            has_waypoint: false,
            state: AnimationState::Idle,
            disposed: false,
        }
    }

    // -----------------------------------------------------------------------
    // Waypoints
    // -----------------------------------------------------------------------

    /// Start a new segment ending at `pose`.
    ///
    /// The previous target becomes the new start.  On the first waypoint
    /// after creation the start is `pose` itself, so the car appears in place
    /// instead of sliding in from the origin.
    pub fn set_next_waypoint(&mut self, pose: Vec3) {
        if self.disposed {
            return;
        }

        self.from = if self.has_waypoint { self.to } else { pose };
        self.has_waypoint = true;
        self.to = pose;
        self.elapsed = 0.0;
        self.duration = self.next_duration;
        self.state = AnimationState::Animating;

        if let Some(heading) = pose::heading_degrees(self.from, self.to) {
            self.heading = heading;
        }
    }

    /// Duration used from the next waypoint on.  The segment in flight keeps
    /// its current denominator.
    pub fn set_movement_duration(&mut self, seconds: f32) {
        self.next_duration = seconds;
    }

    // -----------------------------------------------------------------------
    // Per-frame update
    // -----------------------------------------------------------------------

    /// Advance by `dt` seconds; `time` is the global clock driving wheel spin.
    pub fn tick(&mut self, dt: f32, time: f32) {
        if self.disposed || self.state != AnimationState::Animating {
            return;
        }

        self.elapsed += dt;
        let t = self.progress();
        let position = self.interpolated(t);

        let body_transform = translation_to(position) * rotation(self.heading, Axis::Y);
        self.body.apply(&body_transform);

        let spin = rotation(self.spin_angle(time), Axis::X);
        for wheel in &mut self.wheels {
            wheel.pose(position, self.heading, &spin);
        }

        if t >= 1.0 {
            self.state = AnimationState::Settled;
        }
    }

    /// Release geometry and wheels.  Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.body.release();
        self.wheels.clear();
        self.disposed = true;
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn from(&self) -> Vec3 {
        self.from
    }

    pub fn to(&self) -> Vec3 {
        self.to
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Heading in degrees about +Y.
    pub fn heading(&self) -> f32 {
        self.heading
    }

    /// Interpolation fraction of the current segment, clamped to `[0, 1]`.
    pub fn progress(&self) -> f32 {
        match self.state {
            AnimationState::Idle => 0.0,
            AnimationState::Settled => 1.0,
            AnimationState::Animating if self.duration <= 0.0 => 1.0,
            AnimationState::Animating => (self.elapsed / self.duration).clamp(0.0, 1.0),
        }
    }

    /// Current interpolated position, or `None` before the first waypoint.
    pub fn position(&self) -> Option<Vec3> {
        self.has_waypoint.then(|| self.interpolated(self.progress()))
    }

    /// Wheel spin angle in degrees at global clock `time`.
    pub fn spin_angle(&self, time: f32) -> f32 {
        self.angular_velocity * time
    }

    pub fn body(&self) -> &DeformableMesh {
        &self.body
    }

    pub fn wheels(&self) -> &[WheelSubEntity] {
        &self.wheels
    }

    fn interpolated(&self, t: f32) -> Vec3 {
        if t >= 1.0 {
            self.to
        } else {
            self.from.lerp(self.to, t)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn car() -> CarAnimator {
        CarAnimator::new("car-1", &CarModel::default())
    }

    #[test]
    fn starts_idle_without_position() {
        let mut c = car();
        assert_eq!(c.state(), AnimationState::Idle);
        assert_eq!(c.position(), None);
        c.tick(0.5, 0.5);
        assert_eq!(c.state(), AnimationState::Idle);
        assert_eq!(c.wheels().len(), WHEEL_COUNT);
    }

    #[test]
    fn first_waypoint_appears_in_place() {
        let mut c = car();
        let p0 = Vec3::new(30.0, 0.0, 10.0);
        c.set_next_waypoint(p0);
        assert_eq!(c.from(), p0);
        assert_eq!(c.position(), Some(p0));
    }

    #[test]
    fn movement_duration_applies_from_next_waypoint() {
        let mut c = car();
        c.set_next_waypoint(Vec3::ZERO);
        c.set_movement_duration(4.0);
        assert_eq!(c.duration(), CarAnimator::DEFAULT_DURATION);
        c.set_next_waypoint(Vec3::X);
        assert_eq!(c.duration(), 4.0);
    }

    #[test]
    fn zero_duration_completes_immediately() {
        let mut c = car();
        c.set_movement_duration(0.0);
        c.set_next_waypoint(Vec3::ZERO);
        c.set_next_waypoint(Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(c.position(), Some(Vec3::new(5.0, 0.0, 0.0)));
        c.tick(0.0, 0.0);
        assert_eq!(c.state(), AnimationState::Settled);
    }

    #[test]
    fn heading_kept_when_waypoint_repeats() {
        let mut c = car();
        c.set_next_waypoint(Vec3::ZERO);
        c.set_next_waypoint(Vec3::new(10.0, 0.0, 0.0));
        assert!((c.heading() - 90.0).abs() < 1e-4);
        c.set_next_waypoint(Vec3::new(10.0, 0.0, 0.0));
        assert!((c.heading() - 90.0).abs() < 1e-4);
    }

    #[test]
    fn dispose_is_idempotent_and_final() {
        let mut c = car();
        c.set_next_waypoint(Vec3::ZERO);
        c.dispose();
        c.dispose();
        assert!(c.is_disposed());
        assert!(c.wheels().is_empty());
        assert!(c.body().vertices().is_empty());
        c.set_next_waypoint(Vec3::X);
        assert_eq!(c.to(), Vec3::ZERO);
        c.tick(1.0, 1.0);
    }
}
