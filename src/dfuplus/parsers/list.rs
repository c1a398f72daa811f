use regex::Regex;

use crate::dfuplus::glob;
use crate::error::Result;
use crate::log_plain;
use super::{is_error_line, OutputParser, QueryResult, SOURCE};

/* Shared handling of the `List <mask>` echo and of dfuplus error records */
struct ListOutput {
    expected_first_line: String,
    has_errors: bool,
}

impl ListOutput {
    fn new(mask: &str) -> ListOutput {
        ListOutput {
            expected_first_line: format!("List {}", mask).to_lowercase(),
            has_errors: false,
        }
    }

    /* Returns true when `line` is the echo of the list request */
    fn inspect(&mut self, line: &str) -> bool {
        if is_error_line(line) {
            self.has_errors = true;
        }
        line.trim().to_lowercase() == self.expected_first_line
    }
}

pub struct ListParser {
    mask: String,
    output: ListOutput,
    glob: Regex,
    armed: bool,
    found: bool,
}

impl ListParser {
    pub fn new(mask: &str) -> Result<ListParser> {
        Ok(ListParser {
            mask: String::from(mask),
            output: ListOutput::new(mask),
            glob: glob::compile(mask)?,
            armed: false,
            found: false,
        })
    }

    pub fn mask(&self) -> &str {
        &self.mask
    }
}

impl OutputParser for ListParser {
    fn process_line(&mut self, line: &str) {
        log_plain!(Trace, SOURCE, "Processing Line", line);
        if self.output.inspect(line) {
            self.armed = true;
            return;
        }
        if self.armed && self.glob.is_match(line.trim()) {
            self.found = true;
        }
    }
}

impl QueryResult for ListParser {
    fn found(&self) -> bool {
        self.found
    }

    fn has_errors(&self) -> bool {
        self.output.has_errors
    }
}

pub struct ListingParser {
    output: ListOutput,
    files: Vec<String>,
}

impl ListingParser {
    pub fn new(mask: &str) -> ListingParser {
        ListingParser {
            output: ListOutput::new(mask),
            files: Vec::new(),
        }
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn into_files(self) -> Vec<String> {
        self.files
    }

    pub fn has_errors(&self) -> bool {
        self.output.has_errors
    }
}

impl OutputParser for ListingParser {
    fn process_line(&mut self, line: &str) {
        if self.output.inspect(line) {
            return;
        }
        if self.output.has_errors {
            log_plain!(Warning, SOURCE, "Errors Detected in dfuplus output");
            return;
        }
        let name = line.trim();
        if !name.is_empty() {
            self.files.push(String::from(name));
        }
    }
}
