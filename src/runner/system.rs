use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::io::{BufRead, BufReader, Read};
use std::process::{self, Child, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crate::dfuplus::parsers::OutputParser;
use crate::dfuplus::Command;
use crate::error::{Error, Result};
use crate::log_plain;
use super::{ProcessRunner, RunOutcome, StopSignal};

const SOURCE: &'static str = "runner";

const TICK: Duration = Duration::from_millis(50);
/* How long output is still drained after the process itself has exited */
const DRAIN_GRACE: Duration = Duration::from_millis(500);
const TERM_GRACE: Duration = Duration::from_secs(2);

pub struct SystemRunner {
    exec_timeout: Duration,
}

impl SystemRunner {
    pub fn new(exec_timeout: Duration) -> SystemRunner {
        SystemRunner { exec_timeout }
    }

    /* SIGTERM first, SIGKILL when the process ignores it */
    fn terminate(&self, child: &mut Child) {
        let pid = Pid::from_raw(child.id() as i32);
        if signal::kill(pid, Signal::SIGTERM).is_err() {
            log_plain!(Warning, SOURCE, "Failed to signal dfuplus process");
        }

        let deadline = Instant::now() + TERM_GRACE;
        while Instant::now() < deadline {
            match child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => thread::sleep(TICK),
                Err(_) => break,
            }
        }

        if child.kill().is_err() {
            log_plain!(Error, SOURCE, "Failed to kill dfuplus process");
            return;
        }
        let _ = child.wait();
    }
}

/* Output pumps are detached: they end when the pipe closes or nobody listens anymore */
fn spawn_pump<R: Read + Send + 'static>(stream: R, tx: Sender<String>) -> Result<()> {
    thread::Builder::new()
        .name(String::from("dfuplus-output"))
        .spawn(move || {
            let mut reader = BufReader::new(stream);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
                        if tx.send(String::from(line)).is_err() {
                            break;
                        }
                    },
                }
            }
        })?;

    Ok(())
}

impl ProcessRunner for SystemRunner {
    fn run(&self, command: &Command, parser: &mut dyn OutputParser, stop: &StopSignal) -> Result<RunOutcome> {
        log_plain!(Trace, SOURCE, "Executing", &command.to_string());

        let mut child = process::Command::new(command.executable())
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let (tx, rx) = mpsc::channel();
        let pumps = child.stdout.take().map_or(Ok(()), |out| spawn_pump(out, tx.clone()))
            .and_then(|_| child.stderr.take().map_or(Ok(()), |err| spawn_pump(err, tx.clone())));
        drop(tx);
        if let Err(e) = pumps {
            self.terminate(&mut child);
            return Err(e);
        }

        let deadline = Instant::now() + self.exec_timeout;
        let mut streams_open = true;
        let mut exited: Option<(ExitStatus, Instant)> = None;

        loop {
            if stop.is_raised() {
                /* An exited child is already reaped, its pid must not be signalled */
                if let Some((status, _)) = exited {
                    return Ok(RunOutcome::from_status(status));
                }
                self.terminate(&mut child);
                return Err(Error::Interrupted);
            }
            if exited.is_none() && Instant::now() >= deadline {
                log_plain!(Warning, SOURCE, "Watchdog fired for", &command.to_string());
                self.terminate(&mut child);
                return Ok(RunOutcome::WatchdogKilled);
            }

            if streams_open {
                match rx.recv_timeout(TICK) {
                    Ok(line) => {
                        parser.process_line(&line);
                        continue;
                    },
                    Err(RecvTimeoutError::Timeout) => {},
                    Err(RecvTimeoutError::Disconnected) => streams_open = false,
                }
            }

            if exited.is_none() {
                exited = child.try_wait()?.map(|status| (status, Instant::now()));
            }
            match exited {
                Some((status, _)) if !streams_open => return Ok(RunOutcome::from_status(status)),
                Some((status, at)) if at.elapsed() >= DRAIN_GRACE => return Ok(RunOutcome::from_status(status)),
                None if !streams_open => thread::sleep(TICK),
                _ => {},
            }
        }
    }
}
