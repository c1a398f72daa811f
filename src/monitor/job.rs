use crate::dfuplus::{self, Command};
use crate::dfuplus::parsers::{JobStatus, StatusParser, StatusTracker, SubmissionParser};
use crate::error::{Error, Result};
use crate::log_plain;
use crate::runner::StopSignal;
use super::{Monitor, MonitorOutcome, PollContext, SOURCE};

/* Queries the workunit status until it is no longer NotComplete */
fn poll_status(ctx: PollContext, mut parser: StatusParser) -> Result<JobStatus> {
    let job_id = match parser.job_id() {
        Some(id) => String::from(id),
        None => return Err(Error::BlankJobId),
    };
    let command = dfuplus::status_command(&ctx.base, &job_id);

    ctx.poll_until(|ctx| {
        let outcome = ctx.runner.run(&command, &mut parser, &ctx.stop)?;
        if outcome.is_abort() {
            return Err(Error::ProcessAbort(outcome));
        }

        let status = parser.job_status();
        ctx.ticks.trace(&format!("WUID [{}]; status=[{}]", job_id, status));
        match status.is_terminal() {
            true => Ok(Some(status)),
            false => Ok(None),
        }
    })
}

impl Monitor {
    pub fn submit_and_monitor(&self, command: &Command) -> MonitorOutcome {
        let stop = self.begin();
        let outcome = self.run_job(command, &stop);
        self.finish();

        log_plain!(Info, SOURCE, "Job ended", &outcome.to_string());
        outcome
    }

    fn run_job(&self, command: &Command, stop: &StopSignal) -> MonitorOutcome {
        let mut submission = SubmissionParser::new();
        let submitted = self.runner.run(command, &mut submission, stop);
        let job_id = submission.job_id().map(String::from);

        match submitted {
            Ok(outcome) if outcome.is_abort() => {
                log_plain!(Error, SOURCE, "Submission failed", &outcome.to_string());
                self.abort_job(job_id.as_deref());
                return MonitorOutcome::Aborted;
            },
            Ok(_) => {},
            Err(Error::Interrupted) => {
                self.abort_job(job_id.as_deref());
                return MonitorOutcome::Aborted;
            },
            Err(e) => return MonitorOutcome::Failed(e),
        }

        let job_id = match job_id {
            Some(id) => id,
            None => {
                log_plain!(Error, SOURCE, "No WUID in submission output");
                return MonitorOutcome::Failed(Error::MissingJobId);
            },
        };
        log_plain!(Info, SOURCE, "Submitted WUID", &job_id);

        let parser = match StatusParser::new(&job_id) {
            Ok(parser) => parser,
            Err(e) => return MonitorOutcome::Failed(e),
        };
        let ctx = self.context(stop);
        let result = self.pool
            .submit(move || poll_status(ctx, parser))
            .and_then(|handle| self.wait_for(handle, stop));

        self.conclude(&job_id, result)
    }

    fn conclude(&self, job_id: &str, result: Result<JobStatus>) -> MonitorOutcome {
        match result {
            Ok(JobStatus::Success) => MonitorOutcome::Completed(JobStatus::Success),
            Ok(_) => {
                let e = Error::RemoteJobFailure { job_id: String::from(job_id) };
                log_plain!(Error, SOURCE, &e.to_string());
                MonitorOutcome::Failed(e)
            },
            Err(Error::TimeoutExceeded) => {
                log_plain!(Error, SOURCE, "Timeout exceeded for WUID", job_id);
                self.abort_job(Some(job_id));
                MonitorOutcome::TimedOut
            },
            Err(e @ Error::ProcessAbort(_)) | Err(e @ Error::Interrupted) => {
                log_plain!(Error, SOURCE, &e.to_string(), job_id);
                self.abort_job(Some(job_id));
                MonitorOutcome::Aborted
            },
            Err(e) => MonitorOutcome::Failed(e),
        }
    }
}
