use std::io;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveTime, Utc};
use tracing::{info, warn};

use tradeflow_core::Clock;

use crate::services::{SettlementEngine, SettlementReport};
use crate::store::Store;

/// Once a day at a fixed UTC wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    pub fn at(at: NaiveTime) -> Self {
        Self { at }
    }

    pub fn time(&self) -> NaiveTime {
        self.at
    }

    /// First scheduled instant strictly after `now`.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.at).and_utc();
        if today > now {
            today
        } else {
            today + chrono::Duration::days(1)
        }
    }
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self::at(NaiveTime::from_hms_opt(2, 0, 0).unwrap_or(NaiveTime::MIN))
    }
}

/// Shared slot holding the most recent settlement report.
#[derive(Debug, Clone, Default)]
pub struct LatestSettlement {
    inner: Arc<Mutex<Option<SettlementReport>>>,
}

impl LatestSettlement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<SettlementReport> {
        match self.inner.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn record(&self, report: SettlementReport) {
        match self.inner.lock() {
            Ok(mut slot) => *slot = Some(report),
            Err(poisoned) => *poisoned.into_inner() = Some(report),
        }
    }
}

/// Config for the daily settlement job.
#[derive(Debug, Clone)]
pub struct SettlementScheduler {
    pub schedule: DailySchedule,
    pub poll_interval: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for SettlementScheduler {
    fn default() -> Self {
        Self {
            schedule: DailySchedule::default(),
            poll_interval: Duration::from_millis(250),
            max_retries: 5,
            base_backoff: Duration::from_millis(250),
        }
    }
}

/// Handle for the running scheduler (shutdown + trigger hook).
#[derive(Debug)]
pub struct SettlementSchedulerHandle {
    shutdown: mpsc::Sender<()>,
    trigger: mpsc::SyncSender<()>,
    latest: LatestSettlement,
    join: Option<thread::JoinHandle<()>>,
}

impl SettlementSchedulerHandle {
    /// Request a run now. Triggers are coalesced: if a run is already pending,
    /// this is a no-op.
    pub fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }

    pub fn last_report(&self) -> Option<SettlementReport> {
        self.latest.get()
    }

    /// Reader for the report slot, detached from the handle's lifetime.
    pub fn latest(&self) -> LatestSettlement {
        self.latest.clone()
    }

    /// Gracefully stop the scheduler thread.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

impl SettlementScheduler {
    /// Spawn the scheduler thread.
    ///
    /// - Schedule: one run per day at `schedule`, measured on `clock`
    /// - Trigger: `handle.trigger()` runs as soon as possible
    /// - Failures: logged and retried with bounded exponential backoff; never propagate
    pub fn spawn<S>(
        &self,
        name: &'static str,
        engine: SettlementEngine<S>,
        clock: Arc<dyn Clock>,
        latest: LatestSettlement,
    ) -> io::Result<SettlementSchedulerHandle>
    where
        S: Store + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let (trigger_tx, trigger_rx) = mpsc::sync_channel::<()>(1);

        let cfg = self.clone();
        let slot = latest.clone();
        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || scheduler_loop(name, cfg, shutdown_rx, trigger_rx, engine, clock, slot))?;

        Ok(SettlementSchedulerHandle {
            shutdown: shutdown_tx,
            trigger: trigger_tx,
            latest,
            join: Some(join),
        })
    }
}

fn scheduler_loop<S: Store>(
    name: &'static str,
    cfg: SettlementScheduler,
    shutdown_rx: mpsc::Receiver<()>,
    trigger_rx: mpsc::Receiver<()>,
    engine: SettlementEngine<S>,
    clock: Arc<dyn Clock>,
    latest: LatestSettlement,
) {
    let mut next_run = cfg.schedule.next_run_after(clock.now());
    info!(job = name, next_run = %next_run, "settlement scheduler started");

    let mut pending = false;
    let mut failures: u32 = 0;
    let mut backoff_until: Option<Instant> = None;

    loop {
        // Shutdown has priority.
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        let now = clock.now();
        if now >= next_run {
            pending = true;
            next_run = cfg.schedule.next_run_after(now);
        }

        while trigger_rx.try_recv().is_ok() {
            pending = true;
        }

        if let Some(until) = backoff_until {
            if Instant::now() < until {
                thread::sleep(cfg.poll_interval.min(Duration::from_millis(50)));
                continue;
            }
            backoff_until = None;
        }

        if !pending {
            thread::sleep(cfg.poll_interval);
            continue;
        }

        pending = false;

        match engine.run(clock.as_ref()) {
            Ok(report) => {
                failures = 0;
                latest.record(report);
            }
            Err(e) => {
                warn!(job = name, error = %e, attempt = failures + 1, "settlement run failed");
                failures += 1;
                if failures <= cfg.max_retries {
                    pending = true;
                    backoff_until = Some(Instant::now() + backoff(cfg.base_backoff, failures));
                } else {
                    failures = 0;
                }
            }
        }
    }

    info!(job = name, "settlement scheduler stopped");
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    // base * 2^(attempt-1), capped at 10s.
    let pow = 1u32 << attempt.saturating_sub(1).min(10);
    let ms = base.as_millis().saturating_mul(pow as u128);
    Duration::from_millis(ms.min(10_000) as u64)
}
