//! `SyncLoop` polls the simulator on a fixed cadence and feeds the
//! results to the [`EntityReconciler`].
//!
//! ## Scheduling model
//!
//! ```text
//! host frame loop                    │  spawned request tasks
//! ───────────────────────────────────│──────────────────────────────
//! SyncLoop::frame(dt)                │
//!   → drain channel, apply snapshots │  handshake: POST /init, GET /carPositions
//!   → poll timer expired? spawn ─────┼▶ cycle: GET /update, then
//!   → tick every animator            │         /carPositions + /finishedCars
//!                                    │         + /stopLightStatus (joined)
//!                                    │  → tx.send(SyncMessage) in issue order
//! ```
//!
//! Snapshots are only applied inside `frame`, before any animator is
//! ticked, so a tick never sees a half-applied snapshot.  Request tasks are
//! never cancelled: a slow cycle finishes and is applied like any other.

use crate::error::SyncError;
use crate::protocol::{CarPositions, InitParams, StopLights};
use crate::reconciler::EntityReconciler;
use crate::transport::SimulatorTransport;
use crate::types::SyncStats;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Config & messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    /// Seconds between cycles; also the movement duration of every segment.
    pub poll_interval_secs: f32,
    /// Handshake parameters.
    pub init: InitParams,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 1.0,
            init: InitParams::default(),
        }
    }
}

/// Result of a request task, delivered to the frame loop.
#[derive(Debug, Clone)]
pub enum SyncMessage {
    /// The handshake finished; `ok` is false if `/init` failed.
    Handshake { ok: bool },
    Positions(CarPositions),
    Finished(CarPositions),
    Lights(StopLights),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// `start` not called yet.
    Created,
    /// Waiting for the handshake to complete.
    Handshaking,
    /// Cycles fire whenever the poll timer expires.
    Polling,
}

// ---------------------------------------------------------------------------
// SyncLoop
// ---------------------------------------------------------------------------

pub struct SyncLoop<T: SimulatorTransport> {
    config: SyncConfig,
    transport: Arc<T>,
    reconciler: EntityReconciler,
    tx: mpsc::UnboundedSender<SyncMessage>,
    rx: mpsc::UnboundedReceiver<SyncMessage>,
    stats: Arc<Mutex<SyncStats>>,
    phase: LoopPhase,
    /// Seconds until the next cycle.
    timer: f32,
    /// Global clock (seconds since the first frame).
    clock: f32,
}

impl<T: SimulatorTransport> SyncLoop<T> {
    pub fn new(config: SyncConfig, transport: T, mut reconciler: EntityReconciler) -> Self {
        reconciler.set_movement_duration(config.poll_interval_secs);
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            transport: Arc::new(transport),
            reconciler,
            tx,
            rx,
            stats: Arc::new(Mutex::new(SyncStats::default())),
            phase: LoopPhase::Created,
            timer: config.poll_interval_secs,
            clock: 0.0,
        }
    }

    // -----------------------------------------------------------------------
    // Background mode (spawned tasks + frame-driven apply)
    // -----------------------------------------------------------------------

    /// Spawn the handshake.  Must be called from inside a Tokio runtime.
    pub fn start(&mut self) {
        if self.phase != LoopPhase::Created {
            return;
        }
        self.phase = LoopPhase::Handshaking;
        info!(
            "Sending configuration (timeToSpawn={}, spawnAmount={})",
            self.config.init.time_to_spawn, self.config.init.spawn_amount
        );

        let transport = self.transport.clone();
        let stats = self.stats.clone();
        let tx = self.tx.clone();
        let params = self.config.init;
        tokio::spawn(async move {
            for msg in handshake(transport.as_ref(), params, &stats).await {
                // Receiver gone means the loop was dropped.
                let _ = tx.send(msg);
            }
        });
    }

    /// One host frame: apply finished requests, fire the poll timer, then
    /// advance the clock and every animator.
    pub fn frame(&mut self, dt: f32) {
        self.drain();

        if self.phase == LoopPhase::Polling {
            self.timer -= dt;
            if self.timer < 0.0 {
                self.timer = self.config.poll_interval_secs;
                self.spawn_cycle();
            }
        }

        self.clock += dt;
        self.reconciler.tick(dt, self.clock);
    }

    fn spawn_cycle(&mut self) {
        self.stats.lock().cycles += 1;
        let transport = self.transport.clone();
        let stats = self.stats.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            for msg in poll_cycle(transport.as_ref(), &stats).await {
                let _ = tx.send(msg);
            }
        });
    }

    /// Apply everything that has arrived.  Returns the number of messages.
    fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(msg) = self.rx.try_recv() {
            self.apply(msg);
            applied += 1;
        }
        applied
    }

    // -----------------------------------------------------------------------
    // Inline mode (await the requests, apply immediately)
    // -----------------------------------------------------------------------

    /// Run the handshake to completion and apply its results.
    pub async fn run_handshake(&mut self) {
        self.phase = LoopPhase::Handshaking;
        for msg in handshake(self.transport.as_ref(), self.config.init, &self.stats).await {
            self.apply(msg);
        }
    }

    /// Run one poll cycle to completion and apply its results.
    pub async fn run_cycle(&mut self) {
        self.stats.lock().cycles += 1;
        for msg in poll_cycle(self.transport.as_ref(), &self.stats).await {
            self.apply(msg);
        }
    }

    // -----------------------------------------------------------------------
    // Apply
    // -----------------------------------------------------------------------

    fn apply(&mut self, msg: SyncMessage) {
        match msg {
            SyncMessage::Handshake { ok } => {
                if !ok {
                    warn!("Handshake failed, polling anyway");
                }
                self.phase = LoopPhase::Polling;
                return;
            }
            SyncMessage::Positions(snapshot) => {
                self.reconciler.apply_update_snapshot(&snapshot);
            }
            SyncMessage::Finished(snapshot) => {
                self.reconciler.apply_finished_snapshot(&snapshot);
            }
            SyncMessage::Lights(snapshot) => {
                self.reconciler.apply_light_snapshot(&snapshot);
            }
        }
        self.stats.lock().snapshots_applied += 1;
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn reconciler(&self) -> &EntityReconciler {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut EntityReconciler {
        &mut self.reconciler
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    pub fn stats(&self) -> SyncStats {
        self.stats.lock().clone()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Request sequences
// ---------------------------------------------------------------------------

/// `POST /init`, then one positions query if it succeeded.
async fn handshake<T: SimulatorTransport + ?Sized>(
    transport: &T,
    params: InitParams,
    stats: &Mutex<SyncStats>,
) -> Vec<SyncMessage> {
    let mut out = Vec::new();

    match transport.init(params).await {
        Ok(()) => {
            info!("Configuration upload complete");
            stats.lock().handshake_ok = true;
            out.push(SyncMessage::Handshake { ok: true });
            match transport.car_positions().await {
                Ok(positions) => out.push(SyncMessage::Positions(positions)),
                Err(e) => record_failure(stats, &e),
            }
        }
        Err(e) => {
            record_failure(stats, &e);
            out.push(SyncMessage::Handshake { ok: false });
        }
    }

    out
}

/// `GET /update`, then the three queries concurrently.  Results come back
/// in issue order: positions, finished, lights.  A failed query drops only
/// its own snapshot.
async fn poll_cycle<T: SimulatorTransport + ?Sized>(
    transport: &T,
    stats: &Mutex<SyncStats>,
) -> Vec<SyncMessage> {
    if let Err(e) = transport.step().await {
        record_failure(stats, &e);
        return Vec::new();
    }

    let (positions, finished, lights) = tokio::join!(
        transport.car_positions(),
        transport.finished_cars(),
        transport.stop_lights(),
    );

    let mut out = Vec::with_capacity(3);
    match positions {
        Ok(p) => out.push(SyncMessage::Positions(p)),
        Err(e) => record_failure(stats, &e),
    }
    match finished {
        Ok(f) => out.push(SyncMessage::Finished(f)),
        Err(e) => record_failure(stats, &e),
    }
    match lights {
        Ok(l) => out.push(SyncMessage::Lights(l)),
        Err(e) => record_failure(stats, &e),
    }
    debug!("Poll cycle produced {} snapshot(s)", out.len());
    out
}

fn record_failure(stats: &Mutex<SyncStats>, error: &SyncError) {
    warn!("{}", error);
    let mut s = stats.lock();
    if error.is_malformed() {
        s.malformed_responses += 1;
    } else {
        s.transport_failures += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_are_counted_by_kind() {
        let stats = Mutex::new(SyncStats::default());
        record_failure(&stats, &SyncError::transport("/update", "refused"));
        record_failure(
            &stats,
            &SyncError::Status {
                endpoint: "/carPositions".into(),
                status: 500,
            },
        );
        record_failure(
            &stats,
            &SyncError::Malformed {
                endpoint: "/stopLightStatus".into(),
                source: serde_json::from_str::<serde_json::Value>("[").unwrap_err(),
            },
        );

        let s = stats.lock();
        assert_eq!(s.transport_failures, 2);
        assert_eq!(s.malformed_responses, 1);
    }

    #[test]
    fn default_config_polls_every_second() {
        let config = SyncConfig::default();
        assert_eq!(config.poll_interval_secs, 1.0);
        assert_eq!(config.init, InitParams::default());
    }
}
