use std::fmt;

use crate::log_plain;
use super::{OutputParser, SOURCE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteState {
    Unknown,
    Removing,
    Deleted,
    NotFound,
}

impl DeleteState {
    const ALL: [DeleteState; 4] = [
        DeleteState::Unknown,
        DeleteState::Removing,
        DeleteState::Deleted,
        DeleteState::NotFound,
    ];

    fn text(&self) -> &'static str {
        match self {
            DeleteState::Unknown => "Unknown",
            DeleteState::Removing => "Removing",
            DeleteState::Deleted => "Deleted File",
            DeleteState::NotFound => "File not found",
        }
    }
}

impl fmt::Display for DeleteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

pub struct DeleteParser {
    state: DeleteState,
}

impl DeleteParser {
    pub fn new() -> DeleteParser {
        DeleteParser { state: DeleteState::Unknown }
    }

    pub fn state(&self) -> DeleteState {
        self.state
    }
}

impl OutputParser for DeleteParser {
    fn process_line(&mut self, line: &str) {
        log_plain!(Trace, SOURCE, "Processing Line", line);
        if let Some(state) = DeleteState::ALL.iter().find(|s| line.starts_with(s.text())) {
            self.state = *state;
        }
    }
}
