use crate::log_plain;
use super::{JobStatus, OutputParser, StatusTracker, SOURCE};

const WUID: &'static str = "Submitted WUID ";

#[derive(Default)]
pub struct SubmissionParser {
    job_id: Option<String>,
}

impl SubmissionParser {
    pub fn new() -> SubmissionParser {
        SubmissionParser { job_id: None }
    }
}

impl OutputParser for SubmissionParser {
    fn process_line(&mut self, line: &str) {
        log_plain!(Trace, SOURCE, "Processing Line", line);
        if line.starts_with(WUID) {
            let wuid = line[WUID.len()..].trim();
            if !wuid.is_empty() {
                log_plain!(Trace, SOURCE, "WUID", wuid);
                self.job_id = Some(String::from(wuid));
            }
        }
    }
}

impl StatusTracker for SubmissionParser {
    fn job_status(&self) -> JobStatus {
        JobStatus::NotComplete
    }

    fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }
}
