use crate::dfuplus::{self, glob};
use crate::dfuplus::parsers::{JobStatus, ListParser, QueryResult};
use crate::error::{Error, Result};
use crate::log_plain;
use crate::runner::StopSignal;
use super::{Monitor, MonitorOutcome, PollContext, SOURCE};

fn poll_listing(ctx: PollContext, mask: String) -> Result<()> {
    let command = dfuplus::list_command(&ctx.base, &mask);

    ctx.poll_until(|ctx| {
        /* Match state must only reflect the latest listing */
        let mut parser = ListParser::new(&mask)?;
        let outcome = ctx.runner.run(&command, &mut parser, &ctx.stop)?;
        if outcome.is_abort() {
            return Err(Error::ProcessAbort(outcome));
        }

        if parser.has_errors() {
            return Err(Error::ListErrors { mask: mask.clone() });
        }
        ctx.ticks.trace(&format!("Waiting for [{}]; found=[{}]", mask, parser.found()));
        match parser.found() {
            true => Ok(Some(())),
            false => Ok(None),
        }
    })
}

impl Monitor {
    pub fn wait_for_file(&self, mask: &str) -> MonitorOutcome {
        if let Err(e) = glob::compile(mask) {
            return MonitorOutcome::Failed(e);
        }

        let stop = self.begin();
        let outcome = self.run_file_wait(mask, &stop);
        self.finish();

        log_plain!(Info, SOURCE, "Wait for", mask, &outcome.to_string());
        outcome
    }

    fn run_file_wait(&self, mask: &str, stop: &StopSignal) -> MonitorOutcome {
        let ctx = self.context(stop);
        let owned = String::from(mask);
        let result = self.pool
            .submit(move || poll_listing(ctx, owned))
            .and_then(|handle| self.wait_for(handle, stop));

        match result {
            Ok(()) => MonitorOutcome::Completed(JobStatus::Success),
            Err(Error::TimeoutExceeded) => MonitorOutcome::TimedOut,
            Err(e @ Error::ProcessAbort(_)) | Err(e @ Error::Interrupted) => {
                log_plain!(Warning, SOURCE, &e.to_string(), mask);
                MonitorOutcome::Aborted
            },
            Err(e) => {
                log_plain!(Error, SOURCE, &e.to_string());
                MonitorOutcome::Failed(e)
            },
        }
    }
}
