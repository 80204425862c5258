//! traffic-viewer binary
//!
//! Headless viewer: connects to the traffic simulator, mirrors its cars and
//! stoplights at a fixed frame rate and logs what it sees.
//!
//! ## Configuration (TOML file + env via `config` crate, CLI overrides)
//!
//! | Key                          | Default                 | Description                      |
//! |------------------------------|-------------------------|----------------------------------|
//! | `TRAFFIC_SERVER_URL`         | `http://localhost:8585` | Simulator base URL               |
//! | `TRAFFIC_POLL_INTERVAL_SECS` | `1.0`                   | Seconds between poll cycles      |
//! | `TRAFFIC_TILE_SIZE`          | `10.0`                  | World units per grid cell        |
//! | `TRAFFIC_SPAWN_INTERVAL`     | `1`                     | `timeToSpawn` sent on `/init`    |
//! | `TRAFFIC_SPAWN_AMOUNT`       | `4`                     | `spawnAmount` sent on `/init`    |
//! | `TRAFFIC_FRAME_RATE_HZ`      | `60`                    | Frame loop rate                  |
//! | `TRAFFIC_ANGULAR_VELOCITY`   | `90.0`                  | Wheel spin (degrees / second)    |
//! | `TRAFFIC_LAYOUT_PATH`        | unset                   | City layout file                 |
//! | `TRAFFIC_WORLD_SEED`         | `42`                    | Building height seed             |

use anyhow::{Context, Result};
use clap::Parser;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use traffic_view::{
    city::{CityLayout, TileKind},
    reconciler::EntityReconciler,
    sync::{SyncConfig, SyncLoop},
    transport::{HttpTransport, SimulatorTransport},
    types::{GridMapping, ViewerConfig},
    CarModel, InitParams,
};

/// Seconds of viewer clock between status lines.
const STATUS_EVERY_SECS: f32 = 5.0;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "traffic-viewer", about = "Traffic simulation viewer", version)]
struct Args {
    /// Config file (any format the `config` crate reads; extension optional)
    #[arg(long, env = "TRAFFIC_CONFIG", default_value = "traffic-view")]
    config: String,

    /// Simulator base URL
    #[arg(long)]
    server_url: Option<String>,

    /// Seconds between poll cycles
    #[arg(long)]
    poll_interval_secs: Option<f32>,

    /// Simulator steps between spawns
    #[arg(long)]
    spawn_interval: Option<u32>,

    /// Cars per spawn
    #[arg(long)]
    spawn_amount: Option<u32>,

    /// City layout file
    #[arg(long)]
    layout: Option<String>,
}

fn load_config(args: &Args) -> Result<ViewerConfig> {
    let mut cfg: ViewerConfig = config::Config::builder()
        .add_source(config::File::with_name(&args.config).required(false))
        .add_source(config::Environment::with_prefix("TRAFFIC").try_parsing(true))
        .build()
        .context("reading configuration")?
        .try_deserialize()
        .context("parsing configuration")?;

    if let Some(url) = &args.server_url {
        cfg.server_url = url.clone();
    }
    if let Some(secs) = args.poll_interval_secs {
        cfg.poll_interval_secs = secs;
    }
    if let Some(n) = args.spawn_interval {
        cfg.spawn_interval = n;
    }
    if let Some(n) = args.spawn_amount {
        cfg.spawn_amount = n;
    }
    if let Some(path) = &args.layout {
        cfg.layout_path = Some(path.clone());
    }
    Ok(cfg)
}

// ---------------------------------------------------------------------------
// Frame loop
// ---------------------------------------------------------------------------

/// Drive `sync` at `frame_rate_hz` until `shutdown` resolves.
async fn run_frames<T, F>(sync: &mut SyncLoop<T>, frame_rate_hz: f32, shutdown: F)
where
    T: SimulatorTransport,
    F: Future<Output = ()>,
{
    let period = Duration::from_secs_f32(1.0 / frame_rate_hz.max(1.0));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = Instant::now();
    let mut last_status = 0.0_f32;
    // Polled across iterations so a signal during a frame is not lost.
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last).as_secs_f32();
                last = now;
                sync.frame(dt);

                if sync.clock() - last_status >= STATUS_EVERY_SECS {
                    last_status = sync.clock();
                    let stats = sync.stats();
                    tracing::info!(
                        cars = sync.reconciler().car_count(),
                        lights = sync.reconciler().light_count(),
                        cycles = stats.cycles,
                        failures = stats.transport_failures,
                        malformed = stats.malformed_responses,
                        "Viewer status"
                    );
                }
            }
            _ = &mut shutdown => break,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("traffic_view=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let cfg = load_config(&args)?;

    log::info!(
        "Starting traffic-viewer (server='{}', poll={}s, tile={}, spawn={}x{})",
        cfg.server_url,
        cfg.poll_interval_secs,
        cfg.tile_size,
        cfg.spawn_amount,
        cfg.spawn_interval,
    );

    // Static scene
    if let Some(path) = &cfg.layout_path {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading city layout {path}"))?;
        let city = CityLayout::parse(&text, cfg.tile_size, cfg.world_seed);
        log::info!(
            "City layout {}x{}: {} roads, {} crossroads, {} stoplights, {} destinations, {} buildings",
            city.width,
            city.depth,
            city.count(TileKind::Road) + city.count(TileKind::EmptyRoad),
            city.count(TileKind::Crossroad),
            city.count(TileKind::StopLight),
            city.count(TileKind::Destination),
            city.count(TileKind::Building),
        );
    }

    // Dynamic scene
    let model = CarModel::default().with_angular_velocity(cfg.angular_velocity);
    let reconciler = EntityReconciler::new(
        GridMapping::new(cfg.tile_size),
        cfg.poll_interval_secs,
        model,
    );
    let sync_config = SyncConfig {
        poll_interval_secs: cfg.poll_interval_secs,
        init: InitParams {
            time_to_spawn: cfg.spawn_interval,
            spawn_amount: cfg.spawn_amount,
        },
    };
    let mut sync = SyncLoop::new(
        sync_config,
        HttpTransport::new(cfg.server_url.clone()),
        reconciler,
    );
    sync.start();

    run_frames(&mut sync, cfg.frame_rate_hz, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Ctrl-C handler unavailable: {e}");
        }
    })
    .await;
    log::info!("Shutting down");

    sync.reconciler_mut().clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use traffic_view::{
        error::{Result as SyncResult, SyncError},
        sync::LoopPhase,
        CarPositions, StopLights,
    };

    /// A simulator that is never reachable.
    struct Offline;

    #[async_trait]
    impl SimulatorTransport for Offline {
        async fn init(&self, _params: InitParams) -> SyncResult<()> {
            Err(SyncError::transport("/init", "offline"))
        }

        async fn step(&self) -> SyncResult<()> {
            Err(SyncError::transport("/update", "offline"))
        }

        async fn car_positions(&self) -> SyncResult<CarPositions> {
            Err(SyncError::transport("/carPositions", "offline"))
        }

        async fn finished_cars(&self) -> SyncResult<CarPositions> {
            Err(SyncError::transport("/finishedCars", "offline"))
        }

        async fn stop_lights(&self) -> SyncResult<StopLights> {
            Err(SyncError::transport("/stopLightStatus", "offline"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_signal_stops_the_frame_loop() {
        let mut sync = SyncLoop::new(SyncConfig::default(), Offline, EntityReconciler::default());
        sync.start();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            let _ = tx.send(());
        });

        run_frames(&mut sync, 60.0, async move {
            let _ = rx.await;
        })
        .await;

        assert!(sync.clock() > 0.1);
        assert!(sync.clock() < 1.0);
        assert_eq!(sync.phase(), LoopPhase::Polling);
        assert!(!sync.stats().handshake_ok);
    }
}
