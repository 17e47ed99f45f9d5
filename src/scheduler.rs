use crate::pipeline::ScrapeJob;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

struct Timer {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Runs a scrape job once on start and then at a fixed interval.
///
/// Each run is its own task: stopping the scheduler ends the timer but lets a
/// run that is already underway finish, and a run that fails or panics does
/// not affect later ticks. A tick that arrives while the previous run is still
/// going is skipped.
pub struct ScrapeScheduler {
    interval: Duration,
    job: Arc<dyn ScrapeJob>,
    timer: Mutex<Option<Timer>>,
}

impl ScrapeScheduler {
    pub fn new(interval: Duration, job: Arc<dyn ScrapeJob>) -> Self {
        Self {
            interval,
            job,
            timer: Mutex::new(None),
        }
    }

    /// Start the timer. Returns `false` if it was already running.
    pub fn start(&self) -> bool {
        let mut timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if timer.is_some() {
            warn!("Scrape scheduler already running, ignoring start");
            return false;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(tick_loop(self.interval, self.job.clone(), shutdown_rx));
        *timer = Some(Timer {
            shutdown_tx,
            handle,
        });

        info!(
            interval_secs = self.interval.as_secs(),
            "Scrape scheduler started"
        );
        true
    }

    /// Stop the timer. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let Some(timer) = self.timer.lock().unwrap_or_else(|e| e.into_inner()).take() else {
            return false;
        };

        if timer.shutdown_tx.send(true).is_err() {
            // Timer task is already gone
            timer.handle.abort();
        }
        info!("Scrape scheduler stopped");
        true
    }

    pub fn state(&self) -> SchedulerState {
        let timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        match timer.as_ref() {
            Some(t) if !t.handle.is_finished() => SchedulerState::Running,
            _ => SchedulerState::Stopped,
        }
    }
}

async fn tick_loop(
    interval: Duration,
    job: Arc<dyn ScrapeJob>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    // First tick completes immediately, giving run #0 on start
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut run: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                spawn_run(job.clone(), run);
                run += 1;
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    debug!("Scrape timer exited after {} runs", run);
}

fn spawn_run(job: Arc<dyn ScrapeJob>, run: u64) {
    tokio::spawn(async move {
        info!(run, "Running scheduled water outage scrape");
        match tokio::spawn(async move { job.try_run_cycle().await }).await {
            Ok(Some(records)) => info!(run, found = records.len(), "Scheduled scrape completed"),
            Ok(None) => warn!(run, "Previous scrape still running, skipping this tick"),
            Err(e) => error!(run, "Scheduled scrape failed: {}", e),
        }
    });
}
