#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dfu_monitor::dfuplus::parsers::OutputParser;
use dfu_monitor::dfuplus::Command;
use dfu_monitor::error::{Error, Result};
use dfu_monitor::monitor::{Monitor, MonitorSettings, Pause, WorkerPool};
use dfu_monitor::runner::{ProcessRunner, RunOutcome, StopSignal};

pub type Reply = Result<(Vec<&'static str>, RunOutcome)>;
type Script = Box<dyn Fn(&str, usize, &StopSignal) -> Reply + Send + Sync>;

pub fn ok(lines: Vec<&'static str>) -> Reply {
    Ok((lines, RunOutcome::Finished(0)))
}

/* Answers every dfuplus call from a script keyed on the action and on how
 * many times that action has been run before */
pub struct ScriptedRunner {
    script: Script,
    calls: Mutex<Vec<Command>>,
}

impl ScriptedRunner {
    pub fn new<F>(script: F) -> Arc<ScriptedRunner>
    where
        F: Fn(&str, usize, &StopSignal) -> Reply + Send + Sync + 'static,
    {
        Arc::new(ScriptedRunner {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self, action: &str) -> Vec<Command> {
        self.calls.lock().unwrap().iter()
            .filter(|c| c.action() == Some(action))
            .cloned()
            .collect()
    }

    pub fn count(&self, action: &str) -> usize {
        self.calls(action).len()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, command: &Command, parser: &mut dyn OutputParser, stop: &StopSignal) -> Result<RunOutcome> {
        let action = String::from(command.action().unwrap_or(""));
        let previous = {
            let mut calls = self.calls.lock().unwrap();
            let previous = calls.iter().filter(|c| c.action() == Some(action.as_str())).count();
            calls.push(command.clone());
            previous
        };

        if stop.is_raised() {
            return Err(Error::Interrupted);
        }

        let (lines, outcome) = (self.script)(&action, previous, stop)?;
        for line in lines {
            parser.process_line(line);
        }
        Ok(outcome)
    }
}

/* Records the requested waits instead of sleeping */
#[derive(Default)]
pub struct RecordingPause {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingPause {
    pub fn new() -> Arc<RecordingPause> {
        Arc::new(RecordingPause::default())
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

impl Pause for RecordingPause {
    fn pause(&self, wait: Duration, stop: &StopSignal) -> Result<()> {
        if stop.is_raised() {
            return Err(Error::Interrupted);
        }
        self.waits.lock().unwrap().push(wait);
        Ok(())
    }
}

pub fn base() -> Command {
    Command::new("/opt/HPCCSystems/bin/dfuplus").arg("server=http://192.168.56.101:8010")
}

pub fn settings(poll_ceiling_ms: u64, max_wait_ms: u64) -> MonitorSettings {
    MonitorSettings {
        poll_ceiling: Duration::from_millis(poll_ceiling_ms),
        max_wait: Duration::from_millis(max_wait_ms),
    }
}

pub fn monitor(runner: &Arc<ScriptedRunner>, pause: &Arc<RecordingPause>, settings: MonitorSettings) -> Monitor {
    let pool = Arc::new(WorkerPool::start(1).unwrap());
    Monitor::new(runner.clone(), pool, base(), settings).with_pause(pause.clone())
}
