//! Traffic View
//!
//! Viewer core for a remote traffic simulation: polls the simulator over
//! HTTP and keeps a local mirror of its cars and stoplights, animating each
//! car smoothly between the positions it reports.
//!
//! ## Architecture
//!
//! ```text
//! SyncLoop  (sync.rs)          ← poll cadence, handshake, frame driver
//!   ├── SimulatorTransport  (transport.rs) ← /init, /update, 3 queries
//!   └── EntityReconciler  (reconciler.rs)  ← identity → entity
//!         ├── CarAnimator  (animator.rs)   ← waypoints, heading, wheels
//!         │     └── DeformableMesh  (mesh.rs)
//!         └── StopLight
//! CityLayout  (city.rs)        ← static scene, built once
//! ```
//!
//! All geometry goes through the helpers in `pose.rs`.

// Geometry, animation and reconciliation are runtime-free.
pub mod animator;
pub mod city;
pub mod error;
pub mod mesh;
pub mod pose;
pub mod protocol;
pub mod reconciler;
pub mod types;

// Networking and the poll loop require the `runtime` feature.
#[cfg(feature = "runtime")]
pub mod sync;
#[cfg(feature = "runtime")]
pub mod transport;

pub use animator::{AnimationState, CarAnimator, CarModel, WheelSubEntity};
pub use city::{CityLayout, Placement, TileKind};
pub use error::SyncError;
pub use mesh::{DeformableMesh, Mesh};
pub use protocol::{CarPositions, CarRecord, InitParams, StopLightRecord, StopLights};
pub use reconciler::{EntityReconciler, ReconcileReport, StopLight};
pub use types::{GridMapping, LightColor, LightDirection, SyncStats, ViewerConfig};

// Convenience re-exports (runtime only)
#[cfg(feature = "runtime")]
pub use sync::{LoopPhase, SyncConfig, SyncLoop, SyncMessage};
#[cfg(feature = "runtime")]
pub use transport::{HttpTransport, SimulatorTransport};
