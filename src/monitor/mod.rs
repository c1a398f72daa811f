mod backoff;
mod file_wait;
mod job;
mod pool;

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::MonitorConfig;
use crate::dfuplus::{self, Command};
use crate::dfuplus::parsers::{JobStatus, NoOpParser};
use crate::error::{Error, Result};
use crate::log_plain;
use crate::runner::{ProcessRunner, StopSignal};

pub use backoff::{next_wait, INITIAL_WAIT_MS};
pub use pool::{TaskHandle, WorkerPool};

const SOURCE: &'static str = "monitor";

const TICK_LOG_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug)]
pub enum MonitorOutcome {
    Completed(JobStatus),
    TimedOut,
    Aborted,
    Failed(Error),
}

impl MonitorOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            MonitorOutcome::Completed(JobStatus::Success) => true,
            _ => false,
        }
    }
}

impl fmt::Display for MonitorOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorOutcome::Completed(status) => write!(f, "Completed ({})", status),
            MonitorOutcome::TimedOut => write!(f, "Timed out"),
            MonitorOutcome::Aborted => write!(f, "Aborted"),
            MonitorOutcome::Failed(e) => write!(f, "Failed: {}", e),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonitorSettings {
    pub poll_ceiling: Duration,
    pub max_wait: Duration,
}

impl From<&MonitorConfig> for MonitorSettings {
    fn from(cfg: &MonitorConfig) -> MonitorSettings {
        MonitorSettings {
            poll_ceiling: cfg.poll_ceiling(),
            max_wait: cfg.max_wait(),
        }
    }
}

/* Implementations must return Error::Interrupted once `stop` is raised */
pub trait Pause: Send + Sync {
    fn pause(&self, wait: Duration, stop: &StopSignal) -> Result<()>;
}

pub struct InterruptibleSleep;

impl Pause for InterruptibleSleep {
    fn pause(&self, wait: Duration, stop: &StopSignal) -> Result<()> {
        stop.sleep(wait)
    }
}

/* Lets through at most one trace message per interval */
struct TimedLogger {
    last: Mutex<Option<Instant>>,
    interval: Duration,
}

impl TimedLogger {
    fn new(interval: Duration) -> TimedLogger {
        TimedLogger {
            last: Mutex::new(None),
            interval,
        }
    }

    fn trace(&self, message: &str) {
        let mut last = self.last.lock().unwrap();
        let due = match *last {
            Some(at) => at.elapsed() >= self.interval,
            None => true,
        };
        if due {
            *last = Some(Instant::now());
            log_plain!(Trace, SOURCE, message);
        }
    }
}

/* Everything a polling loop needs on the worker thread */
#[derive(Clone)]
struct PollContext {
    runner: Arc<dyn ProcessRunner>,
    pause: Arc<dyn Pause>,
    ticks: Arc<TimedLogger>,
    base: Command,
    settings: MonitorSettings,
    stop: StopSignal,
}

impl PollContext {
    fn next_wait(&self, previous_ms: u64) -> u64 {
        let ceiling_ms = self.settings.poll_ceiling.as_millis() as u64;
        next_wait(previous_ms, ceiling_ms, &mut rand::thread_rng())
    }

    fn poll_until<T, F>(&self, mut attempt: F) -> Result<T>
    where
        F: FnMut(&PollContext) -> Result<Option<T>>,
    {
        let max_wait_ms = self.settings.max_wait.as_millis() as u64;
        let mut wait_ms = self.next_wait(0);
        let mut total_ms = 0u64;

        loop {
            if let Some(value) = attempt(self)? {
                return Ok(value);
            }

            self.pause.pause(Duration::from_millis(wait_ms), &self.stop)?;
            total_ms = total_ms.saturating_add(wait_ms);
            if total_ms >= max_wait_ms {
                return Err(Error::TimeoutExceeded);
            }
            wait_ms = self.next_wait(wait_ms);
        }
    }
}

/// Submits dfuplus jobs and follows them to completion, one job at a time.
pub struct Monitor {
    runner: Arc<dyn ProcessRunner>,
    pool: Arc<WorkerPool>,
    base: Command,
    settings: MonitorSettings,
    pause: Arc<dyn Pause>,
    current: Mutex<Option<StopSignal>>,
    ticks: Arc<TimedLogger>,
}

impl Monitor {
    pub fn new(runner: Arc<dyn ProcessRunner>, pool: Arc<WorkerPool>, base: Command, settings: MonitorSettings) -> Monitor {
        Monitor {
            runner,
            pool,
            base,
            settings,
            pause: Arc::new(InterruptibleSleep),
            current: Mutex::new(None),
            ticks: Arc::new(TimedLogger::new(TICK_LOG_INTERVAL)),
        }
    }

    pub fn with_pause(mut self, pause: Arc<dyn Pause>) -> Monitor {
        self.pause = pause;
        self
    }

    pub fn cancel(&self) {
        if let Some(stop) = self.current.lock().unwrap().as_ref() {
            log_plain!(Info, SOURCE, "Cancelling monitor run");
            stop.raise();
        }
    }

    fn begin(&self) -> StopSignal {
        let stop = StopSignal::new();
        *self.current.lock().unwrap() = Some(stop.clone());
        stop
    }

    fn finish(&self) {
        *self.current.lock().unwrap() = None;
    }

    fn context(&self, stop: &StopSignal) -> PollContext {
        PollContext {
            runner: self.runner.clone(),
            pause: self.pause.clone(),
            ticks: self.ticks.clone(),
            base: self.base.clone(),
            settings: self.settings,
            stop: stop.clone(),
        }
    }

    /* Waits for a polling task, raising `stop` when the maximum wait runs out */
    fn wait_for<T>(&self, handle: TaskHandle<Result<T>>, stop: &StopSignal) -> Result<T> {
        match handle.wait(self.settings.max_wait)? {
            Some(result) => result,
            None => {
                log_plain!(Warning, SOURCE, "Polling did not finish within the maximum wait");
                stop.raise();
                Err(Error::TimeoutExceeded)
            },
        }
    }

    fn abort_job(&self, job_id: Option<&str>) {
        let job_id = match job_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                log_plain!(Debug, SOURCE, "No WUID to abort");
                return;
            },
        };

        log_plain!(Warning, SOURCE, "Aborting WUID", job_id);
        let command = dfuplus::abort_command(&self.base, job_id);
        match self.runner.run(&command, &mut NoOpParser, &StopSignal::new()) {
            Ok(outcome) if outcome.is_abort() => {
                log_plain!(Error, SOURCE, "Abort of WUID", job_id, &format!("failed with {}", outcome));
            },
            Ok(_) => {},
            Err(e) => log_plain!(Error, SOURCE, "Abort of WUID", job_id, &format!("failed: {}", e)),
        }
    }
}
