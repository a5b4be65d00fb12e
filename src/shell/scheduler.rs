// Periodic driver for the sync job.
//
// Responsibilities
// - Fire the job on a fixed interval, starting immediately.
// - Never run two jobs at once: a tick that lands while a run is active is skipped and counted.
// - Record run health for the status endpoint.
// - Stop on shutdown, letting an active run finish first.

use crate::modules::attendance_sync::core::ports::{AttendanceSource, BoardClient, IdentityStore};
use crate::modules::attendance_sync::use_cases::run_batch::handler::BatchRunner;
use crate::modules::attendance_sync::use_cases::run_batch::report::{ReportSummary, RunError};
use crate::modules::attendance_sync::use_cases::run_batch::window::SyncWindow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

#[async_trait]
pub trait SyncJob: Send + Sync + 'static {
    async fn run(&self) -> Result<ReportSummary, RunError>;
}

/// Syncs the window ending today on every run.
pub struct WindowedSync<TSource, TBoard, TStore>
where
    TSource: AttendanceSource + 'static,
    TBoard: BoardClient + 'static,
    TStore: IdentityStore + 'static,
{
    runner: BatchRunner<TSource, TBoard, TStore>,
    lookback_days: u32,
}

impl<TSource, TBoard, TStore> WindowedSync<TSource, TBoard, TStore>
where
    TSource: AttendanceSource + 'static,
    TBoard: BoardClient + 'static,
    TStore: IdentityStore + 'static,
{
    pub fn new(runner: BatchRunner<TSource, TBoard, TStore>, lookback_days: u32) -> Self {
        Self {
            runner,
            lookback_days,
        }
    }
}

#[async_trait]
impl<TSource, TBoard, TStore> SyncJob for WindowedSync<TSource, TBoard, TStore>
where
    TSource: AttendanceSource + 'static,
    TBoard: BoardClient + 'static,
    TStore: IdentityStore + 'static,
{
    async fn run(&self) -> Result<ReportSummary, RunError> {
        let window = SyncWindow::ending_on(Utc::now().date_naive(), self.lookback_days);
        let report = self.runner.sync_window(window).await?;
        Ok(report.summary())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunHealth {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub ticks_skipped: u64,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_finished_at: Option<DateTime<Utc>>,
    pub last_report: Option<ReportSummary>,
    pub last_error: Option<String>,
}

pub type SharedHealth = Arc<RwLock<RunHealth>>;

/// Clears the in-flight flag when the run ends, panics included.
struct InFlightGuard(Arc<AtomicBool>);

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Scheduler<TJob: SyncJob> {
    job: Arc<TJob>,
    interval: Duration,
    health: SharedHealth,
    in_flight: Arc<AtomicBool>,
}

impl<TJob: SyncJob> Scheduler<TJob> {
    pub fn new(job: Arc<TJob>, interval: Duration, health: SharedHealth) -> Self {
        Self {
            job,
            interval,
            health,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = self.interval.as_secs(), "scheduler started");

        let mut current: Option<JoinHandle<()>> = None;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(handle) = self.tick().await {
                        current = Some(handle);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        if let Some(handle) = current {
            if !handle.is_finished() {
                info!("waiting for the active sync run to finish");
            }
            if let Err(error) = handle.await {
                error!(%error, "sync task aborted");
            }
        }
        info!("scheduler stopped");
    }

    /// Starts a run unless one is already active.
    pub async fn tick(&self) -> Option<JoinHandle<()>> {
        let Some(guard) = InFlightGuard::acquire(&self.in_flight) else {
            self.health.write().await.ticks_skipped += 1;
            warn!("previous sync run still active; skipping tick");
            return None;
        };

        let job = self.job.clone();
        let health = self.health.clone();
        Some(tokio::spawn(async move {
            let _guard = guard;
            run_job(job.as_ref(), &health).await;
        }))
    }
}

async fn run_job<TJob: SyncJob>(job: &TJob, health: &RwLock<RunHealth>) {
    {
        let mut health = health.write().await;
        health.runs_started += 1;
        health.last_started_at = Some(Utc::now());
    }

    let result = job.run().await;

    let mut health = health.write().await;
    health.last_finished_at = Some(Utc::now());
    match result {
        Ok(summary) => {
            health.runs_completed += 1;
            health.last_report = Some(summary);
            health.last_error = None;
        }
        Err(error) => {
            error!(%error, "sync run failed");
            health.runs_failed += 1;
            health.last_error = Some(error.to_string());
        }
    }
}
