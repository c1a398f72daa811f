mod stop;
mod system;

use std::fmt;
use std::process::ExitStatus;

use crate::dfuplus::parsers::OutputParser;
use crate::dfuplus::Command;
use crate::error::Result;

pub use stop::StopSignal;
pub use system::SystemRunner;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Finished(i32),
    WatchdogKilled,
    NonZeroExit(i32),
}

impl RunOutcome {
    pub fn from_status(status: ExitStatus) -> RunOutcome {
        match status.code() {
            Some(0) => RunOutcome::Finished(0),
            Some(code) => RunOutcome::NonZeroExit(code),
            /* terminated by a signal we did not send */
            None => RunOutcome::NonZeroExit(-1),
        }
    }

    pub fn is_abort(&self) -> bool {
        match self {
            RunOutcome::Finished(_) => false,
            RunOutcome::WatchdogKilled | RunOutcome::NonZeroExit(_) => true,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Finished(code) => write!(f, "exit code {}", code),
            RunOutcome::WatchdogKilled => write!(f, "killed by watchdog"),
            RunOutcome::NonZeroExit(code) => write!(f, "exit code {}", code),
        }
    }
}

/// Feeds the combined output of `command` to `parser`; ends with `Error::Interrupted` once `stop` is raised.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, command: &Command, parser: &mut dyn OutputParser, stop: &StopSignal) -> Result<RunOutcome>;
}
