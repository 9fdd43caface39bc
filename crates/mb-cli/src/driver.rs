//! Real-time tick loop around a [`Simulation`].
//!
//! While running, the simulation lives inside a single tokio task that ticks
//! on a fixed interval; ticks never overlap and missed ones are skipped.
//! `stop` hands the simulation back so it can be inspected or restarted.

use std::time::Duration;

use anyhow::{Context, Result};
use mb_core::{Injection, Simulation, Snapshot};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

const INJECTION_QUEUE: usize = 256;

/// Cheap handle for feeding injections into a running (or parked) driver.
/// Injections are applied at the start of the next tick.
#[derive(Clone, Debug)]
pub struct Injector {
    tx: mpsc::Sender<Injection>,
}

impl Injector {
    /// Returns false when the queue is full or the driver is gone.
    pub fn inject(&self, injection: Injection) -> bool {
        match self.tx.try_send(injection) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("dropping injection: {e}");
                false
            }
        }
    }
}

struct Parked {
    sim: Simulation,
    injections: mpsc::Receiver<Injection>,
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<Parked>,
}

pub struct Driver {
    period: Duration,
    epoch: Instant,
    parked: Option<Parked>,
    running: Option<Running>,
    injector: Injector,
    snapshots: watch::Sender<Option<Snapshot>>,
}

impl Driver {
    pub fn new(sim: Simulation, period: Duration) -> Self {
        let (tx, rx) = mpsc::channel(INJECTION_QUEUE);
        let (snapshots, _) = watch::channel(None);
        Self {
            period,
            epoch: Instant::now(),
            parked: Some(Parked {
                sim,
                injections: rx,
            }),
            running: None,
            injector: Injector { tx },
            snapshots,
        }
    }

    pub fn injector(&self) -> Injector {
        self.injector.clone()
    }

    /// Latest snapshot, updated after every tick.
    pub fn subscribe(&self) -> watch::Receiver<Option<Snapshot>> {
        self.snapshots.subscribe()
    }

    /// The simulation, while parked.
    pub fn simulation(&self) -> Option<&Simulation> {
        self.parked.as_ref().map(|p| &p.sim)
    }

    /// Spawn the tick task. Returns false if it was already running.
    /// Must be called from inside a tokio runtime.
    pub fn start(&mut self) -> bool {
        if self.running.is_some() {
            return false;
        }
        let Some(parked) = self.parked.take() else {
            tracing::warn!("simulation lost after a failed tick task, cannot start");
            return false;
        };

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tick_loop(
            parked,
            self.period,
            self.epoch,
            cancel.clone(),
            self.snapshots.clone(),
        ));
        self.running = Some(Running { cancel, handle });
        tracing::info!(period_ms = self.period.as_millis() as u64, "driver started");
        true
    }

    /// Cancel the tick task and wait for it to finish, so no tick runs
    /// after this returns. Returns false if it was not running.
    pub async fn stop(&mut self) -> Result<bool> {
        let Some(running) = self.running.take() else {
            return Ok(false);
        };
        running.cancel.cancel();
        let parked = running.handle.await.context("tick task failed")?;
        tracing::info!(ticks = parked.sim.ticks(), "driver stopped");
        self.parked = Some(parked);
        Ok(true)
    }
}

async fn tick_loop(
    mut parked: Parked,
    period: Duration,
    epoch: Instant,
    cancel: CancellationToken,
    snapshots: watch::Sender<Option<Snapshot>>,
) -> Parked {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                while let Ok(injection) = parked.injections.try_recv() {
                    parked.sim.inject(injection);
                }
                let now = epoch.elapsed().as_secs_f64() * 1000.0;
                let snap = parked.sim.tick(now);
                snapshots.send_replace(Some(snap));
            }
        }
    }
    parked
}
