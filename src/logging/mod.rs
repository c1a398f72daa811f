use std::collections::BTreeMap;
use std::fmt;
use std::sync::RwLock;
use journald::*;
use lazy_static::lazy_static;
use serde_derive::Deserialize;
use time;

pub const DELIM: &'static str = ";";

const PRIORITY: &'static str = "PRIORITY";
const SOURCE: &'static str = "SOURCE";

/* Ordered from the most verbose to the most severe */
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}
macro_rules! priority_text {
    ($var:ident, $($item:ident),*) => {
        match $var {
            $(Priority::$item => stringify!($item),)*
        }
    };
}

impl Priority {
    /* journald has no trace level, trace records go out as debug */
    fn journal_level(self) -> i32 {
        match self {
            Priority::Trace | Priority::Debug => 7,
            Priority::Info => 6,
            Priority::Warning => 4,
            Priority::Error => 3,
            Priority::Critical => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.journal_level())
    }
}

lazy_static! {
    static ref THRESHOLD: RwLock<Priority> = RwLock::new(Priority::Info);
}

pub fn set_threshold(pri: Priority) {
    *THRESHOLD.write().unwrap() = pri;
}

pub fn enabled(pri: Priority) -> bool {
    pri >= *THRESHOLD.read().unwrap()
}

fn priority_to_text(pri: Priority) -> String {
    let text = priority_text!(pri, Trace, Debug, Info, Warning, Error, Critical);
    text.to_uppercase()
}

fn make_log_entry(pri: Priority, source: &str, message: &str) -> JournalEntry {
    let mut fields = BTreeMap::new();

    fields.insert(String::from(PRIORITY), pri.to_string());
    fields.insert(String::from(SOURCE), String::from(source));

    let mut entry = JournalEntry::from(&fields);
    entry.set_message(message);

    entry
}

fn log_file(pri: Priority, source: &str, message: &str) {
    let now = time::OffsetDateTime::now_utc();
    let time_str = format!(
        "{}-{:02}-{:02} {:02}:{:02}:{:02}.{:03} ({} UTC)",
        now.year(), now.month(), now.day(),
        now.hour(), now.minute(), now.second(), now.millisecond(),
        now.offset()
    );

    let tokens = vec![priority_to_text(pri), time_str, source.to_string(), message.to_string()];

    println!("{}", tokens.into_iter().fold(String::new(), |a, b| a + &b + DELIM));
}

fn log_journald(pri: Priority, source: &str, message: &str) {
    let entry = make_log_entry(pri, source, message);
    /* The journal may be unavailable (containers, CI), stdout still gets the record */
    let _ = journald::writer::submit(&entry);
}

pub fn plain(pri: Priority, source: &str, message: &str) {
    if !enabled(pri) {
        return;
    }

    log_journald(pri, source, message);
    log_file(pri, source, message);
}

pub fn log_startup_message() -> std::io::Result<()> {
    let entry = make_log_entry(Priority::Info, "core", "dfu-monitor is starting up...");
    log_file(Priority::Info, "core", "dfu-monitor is starting up...");

    journald::writer::submit(&entry)
}

#[macro_export]
macro_rules! log_plain {
    ($pri:ident, $source:ident, $($segment:expr),*) => {
        {
            let mut msg = String::new();
            $(
                msg.push_str($segment); msg.push_str($crate::logging::DELIM);
            )*
            $crate::logging::plain($crate::logging::Priority::$pri, $source, &msg);
        }
    };
}
