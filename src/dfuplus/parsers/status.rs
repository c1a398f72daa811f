use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::log_plain;
use super::{JobState, JobStatus, OutputParser, StatusTracker, SOURCE};

pub struct StatusParser {
    job_id: String,
    state: JobState,
    status: JobStatus,
    expected: HashMap<String, JobState>,
}

fn expected_lines(wuid: &str) -> HashMap<String, JobState> {
    let mut map = HashMap::new();
    for state in JobState::ALL.iter() {
        let line = match state {
            JobState::Finished => format!("{} Finished", wuid),
            _ => format!("{} status: {}", wuid, state.name()),
        };
        map.insert(line.to_lowercase(), *state);
    }
    map
}

impl StatusParser {
    pub fn new(wuid: &str) -> Result<StatusParser> {
        let wuid = wuid.trim();
        if wuid.is_empty() {
            return Err(Error::BlankJobId);
        }

        Ok(StatusParser {
            job_id: String::from(wuid),
            state: JobState::Unknown,
            status: JobStatus::NotComplete,
            expected: expected_lines(wuid),
        })
    }

    pub fn job_state(&self) -> JobState {
        self.state
    }

    pub fn classify(&self, line: &str) -> Option<JobState> {
        let line = line.trim().to_lowercase();
        if let Some(state) = self.expected.get(&line) {
            return Some(*state);
        }

        self.expected.iter()
            .find(|(key, _)| {
                line.starts_with(key.as_str()) &&
                    line[key.len()..].starts_with(|c: char| !c.is_alphanumeric())
            })
            .map(|(_, state)| *state)
    }
}

impl OutputParser for StatusParser {
    fn process_line(&mut self, line: &str) {
        log_plain!(Trace, SOURCE, "Processing Line", line);
        let state = match self.classify(line) {
            Some(state) => state,
            None => return,
        };

        let old_status = self.status;
        self.state = state;
        self.status = state.status();
        if old_status != self.status {
            log_plain!(
                Trace, SOURCE,
                "Status change for WUID", &self.job_id,
                &format!("now {}({})", self.status, self.state)
            );
        }
    }
}

impl StatusTracker for StatusParser {
    fn job_status(&self) -> JobStatus {
        self.status
    }

    fn job_id(&self) -> Option<&str> {
        Some(self.job_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WUID: &'static str = "D20160607-142043";

    #[test]
    fn blank_wuid_fails_fast() {
        assert!(matches!(StatusParser::new(""), Err(Error::BlankJobId)));
        assert!(matches!(StatusParser::new("   "), Err(Error::BlankJobId)));
    }

    #[test]
    fn finished_is_success() {
        let mut parser = StatusParser::new(WUID).unwrap();
        parser.process_line("D20160607-142043 Finished");
        assert_eq!(parser.job_status(), JobStatus::Success);
        assert_eq!(parser.job_state(), JobState::Finished);
    }

    #[test]
    fn failed_is_failure() {
        let mut parser = StatusParser::new(WUID).unwrap();
        parser.process_line("D20160607-142043 status: failed");
        assert_eq!(parser.job_status(), JobStatus::Failure);
    }

    #[test]
    fn queued_is_not_complete() {
        let mut parser = StatusParser::new(WUID).unwrap();
        parser.process_line("D20160607-142043 status: queued");
        assert_eq!(parser.job_status(), JobStatus::NotComplete);
        assert_eq!(parser.job_state(), JobState::Queued);
    }

    #[test]
    fn unrelated_lines_keep_previous_status() {
        let mut parser = StatusParser::new(WUID).unwrap();
        parser.process_line("D20160607-142043 status: failed");
        parser.process_line("1% Done, 6m 38s left (2/94MB @230KB/sec) current rate=230KB/sec [0/1nodes]");
        parser.process_line("Total time taken 5m 14s, Average transfer 154596KB/sec");
        parser.process_line("D20160607-999999 Finished");
        assert_eq!(parser.job_status(), JobStatus::Failure);
        assert_eq!(parser.classify("garbage"), None);
    }

    #[test]
    fn matching_ignores_case() {
        let mut parser = StatusParser::new(WUID).unwrap();
        parser.process_line("d20160607-142043 FINISHED");
        assert_eq!(parser.job_status(), JobStatus::Success);
    }

    #[test]
    fn trailing_detail_after_state() {
        let mut parser = StatusParser::new("D20160607-132253").unwrap();
        parser.process_line("D20160607-132253 status: failed - Total time taken 5m 14s, Average transfer 154596KB/sec");
        assert_eq!(parser.job_state(), JobState::Failed);
        assert_eq!(parser.job_status(), JobStatus::Failure);
    }

    #[test]
    fn state_names_need_a_word_boundary() {
        let parser = StatusParser::new(WUID).unwrap();
        assert_eq!(parser.classify("D20160607-142043 status: startedx"), None);
        assert_eq!(parser.classify("D20160607-142043 status: aborting"), Some(JobState::Aborting));
        assert_eq!(parser.classify("D20160607-142043 status: aborted"), Some(JobState::Aborted));
    }

    #[test]
    fn state_survives_across_queries() {
        let mut parser = StatusParser::new(WUID).unwrap();
        parser.process_line("D20160607-142043 status: started");
        parser.process_line("50% Done");
        assert_eq!(parser.job_state(), JobState::Started);
        parser.process_line("D20160607-142043 status: monitoring");
        assert_eq!(parser.job_status(), JobStatus::Success);
    }

    #[test]
    fn every_state_has_an_expected_line() {
        let parser = StatusParser::new(WUID).unwrap();
        assert_eq!(parser.expected.len(), JobState::ALL.len());
        assert_eq!(parser.job_id(), Some(WUID));
    }
}
