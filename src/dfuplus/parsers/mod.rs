mod delete;
mod list;
mod status;
mod submission;

use std::fmt;
use lazy_static::lazy_static;
use regex::Regex;

pub use delete::{DeleteParser, DeleteState};
pub use list::{ListParser, ListingParser};
pub use status::StatusParser;
pub use submission::SubmissionParser;

const SOURCE: &'static str = "parser";

// Sample dfuplus output, fed one line at a time:
//
//   Fixed spraying from /data/weather02/* on 192.168.72.83:7100 to ~zzlc::json::weather
//   Submitted WUID D20160607-142043
//
//   D20160607-132253 Finished
//   Total time taken 5m 14s, Average transfer 154596KB/sec

lazy_static! {
    /* dfuplus internal logging, e.g. 00000000 2016-06-16 15:55:40 18852 20308 "ERROR: ..." */
    static ref ERROR_LINE: Regex = Regex::new(r#"^[0-9]+ [0-9\-]+ [0-9:]+ [0-9]+ [0-9]+ "(.*)""#).unwrap();
}

pub fn is_error_line(line: &str) -> bool {
    ERROR_LINE.is_match(line)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Success,
    Failure,
    NotComplete,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        *self != JobStatus::NotComplete
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            JobStatus::Success => "SUCCESS",
            JobStatus::Failure => "FAILURE",
            JobStatus::NotComplete => "NOT_COMPLETE",
        };
        write!(f, "{}", text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobState {
    Unknown,
    Scheduled,
    Queued,
    Started,
    Aborted,
    Failed,
    Finished,
    Monitoring,
    Aborting,
    Deleted,
}

impl JobState {
    pub const ALL: [JobState; 10] = [
        JobState::Unknown,
        JobState::Scheduled,
        JobState::Queued,
        JobState::Started,
        JobState::Aborted,
        JobState::Failed,
        JobState::Finished,
        JobState::Monitoring,
        JobState::Aborting,
        JobState::Deleted,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            JobState::Unknown => "unknown",
            JobState::Scheduled => "scheduled",
            JobState::Queued => "queued",
            JobState::Started => "started",
            JobState::Aborted => "aborted",
            JobState::Failed => "failed",
            JobState::Finished => "finished",
            JobState::Monitoring => "monitoring",
            JobState::Aborting => "aborting",
            JobState::Deleted => "deleted",
        }
    }

    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Finished | JobState::Monitoring => JobStatus::Success,
            JobState::Scheduled | JobState::Queued | JobState::Started => JobStatus::NotComplete,
            JobState::Unknown
            | JobState::Aborted
            | JobState::Failed
            | JobState::Aborting
            | JobState::Deleted => JobStatus::Failure,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub trait OutputParser {
    fn process_line(&mut self, line: &str);
}

pub trait StatusTracker: OutputParser {
    fn job_status(&self) -> JobStatus;
    fn job_id(&self) -> Option<&str>;
}

pub trait QueryResult: OutputParser {
    fn found(&self) -> bool;
    fn has_errors(&self) -> bool;
}

pub struct NoOpParser;

impl OutputParser for NoOpParser {
    fn process_line(&mut self, _line: &str) {}
}
