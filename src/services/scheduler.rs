use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{error, info};

use crate::{
    error::Result,
    services::{
        alert_engine::{AlertEngine, SweepReport},
        retention::{CleanupReport, Retention},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duty {
    Sweep,
    Cleanup,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DutyReport {
    Sweep(SweepReport),
    Cleanup(CleanupReport),
}

/// Drives the periodic sweep and retention cleanup.
///
/// Both duties fire once right after `start` and then on their interval.
/// They share nothing but the repository, so they run on separate tasks and
/// manual triggers may overlap with a scheduled run.
pub struct Scheduler {
    engine: Arc<AlertEngine>,
    retention: Arc<Retention>,
    sweep_every: Duration,
    cleanup_every: Duration,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

async fn run_duty(
    engine: &AlertEngine,
    retention: &Retention,
    duty: Duty,
) -> Result<DutyReport> {
    match duty {
        Duty::Sweep => engine.evaluate_all().await.map(DutyReport::Sweep),
        Duty::Cleanup => Ok(DutyReport::Cleanup(retention.run().await)),
    }
}

impl Scheduler {
    pub fn new(
        engine: Arc<AlertEngine>,
        retention: Arc<Retention>,
        sweep_every: Duration,
        cleanup_every: Duration,
    ) -> Self {
        Self {
            engine,
            retention,
            sweep_every,
            cleanup_every,
            tasks: Mutex::new(Vec::new()),
        }
    }

    fn spawn_loop(&self, duty: Duty, every: Duration) -> JoinHandle<()> {
        let engine = self.engine.clone();
        let retention = self.retention.clone();

        tokio::spawn(async move {
            let mut interval = time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                // first tick completes immediately
                interval.tick().await;

                if let Err(e) = run_duty(&engine, &retention, duty).await {
                    error!(duty = ?duty, error = %e, "scheduled duty failed");
                }
            }
        })
    }

    /// Starts both loops. Calling it again while running does nothing.
    pub fn start(&self) {
        let Ok(mut tasks) = self.tasks.lock() else {
            return;
        };
        if !tasks.is_empty() {
            return;
        }

        info!(
            sweep_secs = self.sweep_every.as_secs(),
            cleanup_secs = self.cleanup_every.as_secs(),
            "scheduler started"
        );

        tasks.push(self.spawn_loop(Duty::Sweep, self.sweep_every));
        tasks.push(self.spawn_loop(Duty::Cleanup, self.cleanup_every));
    }

    pub fn stop(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            if tasks.is_empty() {
                return;
            }
            for task in tasks.drain(..) {
                task.abort();
            }
            info!("scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.tasks
            .lock()
            .map(|tasks| !tasks.is_empty())
            .unwrap_or(false)
    }

    /// Runs a duty now, outside the timers.
    pub async fn trigger(&self, duty: Duty) -> Result<DutyReport> {
        info!(duty = ?duty, "manual trigger");
        run_duty(&self.engine, &self.retention, duty).await
    }

    pub async fn sweep_now(&self) -> Result<SweepReport> {
        info!("manual sweep");
        self.engine.evaluate_all().await
    }

    pub async fn cleanup_now(&self) -> CleanupReport {
        info!("manual cleanup");
        self.retention.run().await
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
