use std::sync::{Arc, Mutex};

use crate::config::{Config, MonitorConfig};
use crate::dfuplus::{self, Command};
use crate::error::{Error, Result};
use crate::log_plain;
use crate::monitor::{Monitor, MonitorSettings, Pause, WorkerPool};
use crate::runner::{ProcessRunner, StopSignal, SystemRunner};
use super::{Execution, Operation, Report, SOURCE};

/// Runs operations against one dfuplus connection.
pub struct Executor {
    runner: Arc<dyn ProcessRunner>,
    pool: Arc<WorkerPool>,
    base: Command,
    monitor: Monitor,
    single_run: Mutex<Option<StopSignal>>,
}

impl Executor {
    pub fn start(cfg: &Config) -> Result<Executor> {
        let base = dfuplus::base_command(&cfg.connection)?;
        let runner = Arc::new(SystemRunner::new(cfg.monitor.exec_timeout()));

        Executor::with_runner(runner, base, &cfg.monitor)
    }

    pub fn with_runner(runner: Arc<dyn ProcessRunner>, base: Command, cfg: &MonitorConfig) -> Result<Executor> {
        let pool = Arc::new(WorkerPool::start(cfg.worker_threads)?);
        let monitor = Monitor::new(runner.clone(), pool.clone(), base.clone(), MonitorSettings::from(cfg));

        Ok(Executor {
            runner,
            pool,
            base,
            monitor,
            single_run: Mutex::new(None),
        })
    }

    pub fn with_pause(mut self, pause: Arc<dyn Pause>) -> Executor {
        self.monitor = self.monitor.with_pause(pause);
        self
    }

    pub fn execute(&self, op: &Operation) -> Result<Report> {
        if !self.pool.is_running() {
            return Err(Error::PoolShutDown);
        }

        let plan = op.plan(&self.base);
        log_plain!(Info, SOURCE, "Executing", op.name());

        match plan.execution {
            Execution::Monitored => {
                let outcome = self.monitor.submit_and_monitor(&plan.command);
                if outcome.is_success() {
                    if let Err(e) = op.after_success() {
                        log_plain!(Warning, SOURCE, "Cleanup after", op.name(), &e.to_string());
                    }
                }
                Ok(Report::Monitored(outcome))
            },
            Execution::FileWait(mask) => Ok(Report::Monitored(self.monitor.wait_for_file(&mask))),
            Execution::Once(kind) => {
                let mut parser = kind.create();
                let stop = StopSignal::new();
                *self.single_run.lock().unwrap() = Some(stop.clone());
                let result = self.runner.run(&plan.command, &mut parser, &stop);
                *self.single_run.lock().unwrap() = None;

                let outcome = result?;
                if outcome.is_abort() {
                    log_plain!(Error, SOURCE, op.name(), &outcome.to_string());
                    return Err(Error::ProcessAbort(outcome));
                }
                Ok(parser.into_report())
            },
        }
    }

    /* Interrupts whatever execute() is running; monitored jobs get aborted remotely */
    pub fn stop(&self) {
        if let Some(stop) = self.single_run.lock().unwrap().as_ref() {
            stop.raise();
        }
        self.monitor.cancel();
    }

    pub fn shutdown(&self) {
        self.stop();
        self.pool.shutdown();
        log_plain!(Info, SOURCE, "Executor shut down");
    }
}
