mod executor;

use std::net::UdpSocket;
use std::path::{Path, PathBuf};

use crate::dfuplus::{self, Command, ACTION_DESPRAY, ACTION_REMOVE, ACTION_SPRAY, NOWAIT};
use crate::dfuplus::parsers::{DeleteParser, DeleteState, ListingParser, OutputParser};
use crate::dfuplus::spray_format::SprayFormat;
use crate::error::Result;
use crate::log_plain;
use crate::monitor::MonitorOutcome;

pub use executor::Executor;

const SOURCE: &'static str = "operations";

const FALLBACK_IP: &'static str = "127.0.0.1";

#[derive(Clone, Debug, PartialEq)]
pub struct SprayRequest {
    pub source_file: PathBuf,
    pub logical_filename: String,
    pub cluster: String,
    pub overwrite: bool,
    pub format: Option<SprayFormat>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SprayDirectoryRequest {
    pub source_directory: PathBuf,
    pub logical_filename: String,
    pub cluster: String,
    pub overwrite: bool,
    pub prefix: Option<String>,
    pub delete_source_directory: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DesprayRequest {
    pub logical_filename: String,
    pub destination_file: PathBuf,
    pub destination_ip: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    Spray(SprayRequest),
    SprayDirectory(SprayDirectoryRequest),
    Despray(DesprayRequest),
    Delete { logical_filename: String },
    List { filemask: String },
    Poll { logical_filename: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParserKind {
    Delete,
    Listing(String),
}

pub enum Parser {
    Delete(DeleteParser),
    Listing(ListingParser),
}

impl ParserKind {
    pub fn create(&self) -> Parser {
        match self {
            ParserKind::Delete => Parser::Delete(DeleteParser::new()),
            ParserKind::Listing(mask) => Parser::Listing(ListingParser::new(mask)),
        }
    }
}

impl Parser {
    pub fn into_report(self) -> Report {
        match self {
            Parser::Delete(p) => Report::Deleted(p.state()),
            Parser::Listing(p) => {
                let has_errors = p.has_errors();
                Report::Listed { files: p.into_files(), has_errors }
            },
        }
    }
}

impl OutputParser for Parser {
    fn process_line(&mut self, line: &str) {
        match self {
            Parser::Delete(p) => p.process_line(line),
            Parser::Listing(p) => p.process_line(line),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Execution {
    Monitored,
    FileWait(String),
    Once(ParserKind),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Plan {
    pub command: Command,
    pub execution: Execution,
}

#[derive(Debug)]
pub enum Report {
    Monitored(MonitorOutcome),
    Deleted(DeleteState),
    Listed { files: Vec<String>, has_errors: bool },
}

fn flag(value: bool) -> &'static str {
    match value {
        true => "1",
        false => "0",
    }
}

/* Address the cluster uses to reach this host, no packet is sent */
fn local_ip() -> String {
    let local = UdpSocket::bind("0.0.0.0:0")
        .and_then(|s| s.connect("8.8.8.8:80").map(|_| s))
        .and_then(|s| s.local_addr());

    match local {
        Ok(addr) => addr.ip().to_string(),
        Err(e) => {
            log_plain!(Warning, SOURCE, "Cannot determine local address", &e.to_string());
            String::from(FALLBACK_IP)
        },
    }
}

fn spray_command(base: &Command, cluster: &str, overwrite: bool) -> Command {
    base.clone()
        .arg(ACTION_SPRAY)
        .arg(format!("dstcluster={}", cluster))
        .arg(format!("overwrite={}", flag(overwrite)))
        .arg(NOWAIT)
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Spray(_) => "spray",
            Operation::SprayDirectory(_) => "spray-dir",
            Operation::Despray(_) => "despray",
            Operation::Delete { .. } => "delete",
            Operation::List { .. } => "list",
            Operation::Poll { .. } => "poll",
        }
    }

    pub fn plan(&self, base: &Command) -> Plan {
        match self {
            Operation::Spray(req) => {
                let mut cmd = spray_command(base, &req.cluster, req.overwrite);
                if let Some(format) = &req.format {
                    cmd = format.add_arguments(cmd);
                }
                let cmd = cmd
                    .arg(format!("srcfile={}", req.source_file.display()))
                    .arg(format!("dstname={}", req.logical_filename));

                Plan { command: cmd, execution: Execution::Monitored }
            },
            Operation::SprayDirectory(req) => {
                let mut cmd = spray_command(base, &req.cluster, req.overwrite)
                    .arg(format!("srcfile={}", req.source_directory.join("*").display()))
                    .arg(format!("dstname={}", req.logical_filename));
                if let Some(prefix) = req.prefix.as_deref().filter(|p| !p.trim().is_empty()) {
                    cmd = cmd.arg(format!("PREFIX={}", prefix));
                }

                Plan { command: cmd.arg("nosplit=1"), execution: Execution::Monitored }
            },
            Operation::Despray(req) => {
                let ip = match &req.destination_ip {
                    Some(ip) => ip.clone(),
                    None => local_ip(),
                };
                let cmd = base.clone()
                    .arg(ACTION_DESPRAY)
                    .arg(format!("srcname={}", req.logical_filename))
                    .arg(format!("dstfile={}", req.destination_file.display()))
                    .arg(format!("dstip={}", ip))
                    .arg("overwrite=1")
                    .arg(NOWAIT);

                Plan { command: cmd, execution: Execution::Monitored }
            },
            Operation::Delete { logical_filename } => Plan {
                command: base.clone().arg(ACTION_REMOVE).arg(format!("name={}", logical_filename)),
                execution: Execution::Once(ParserKind::Delete),
            },
            Operation::List { filemask } => Plan {
                command: dfuplus::list_command(base, filemask),
                execution: Execution::Once(ParserKind::Listing(filemask.clone())),
            },
            Operation::Poll { logical_filename } => Plan {
                command: dfuplus::list_command(base, logical_filename),
                execution: Execution::FileWait(logical_filename.clone()),
            },
        }
    }

    pub fn after_success(&self) -> Result<()> {
        if let Operation::SprayDirectory(req) = self {
            if req.delete_source_directory {
                remove_directory(&req.source_directory)?;
            }
        }
        Ok(())
    }
}

fn remove_directory(dir: &Path) -> Result<()> {
    log_plain!(Info, SOURCE, "Removing sprayed directory", &dir.display().to_string());
    std::fs::remove_dir_all(dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Command {
        Command::new("/bin/dfuplus").arg("server=1.2.3.4")
    }

    fn args(plan: &Plan) -> Vec<&str> {
        plan.command.args().iter().map(String::as_str).collect()
    }

    #[test]
    fn spray_with_format() {
        let op = Operation::Spray(SprayRequest {
            source_file: PathBuf::from("/data/weather.csv"),
            logical_filename: String::from("~zzlc::csv::weather"),
            cluster: String::from("mythor"),
            overwrite: true,
            format: Some(SprayFormat::csv()),
        });

        let plan = op.plan(&base());
        assert_eq!(args(&plan), vec![
            "server=1.2.3.4", "action=spray", "dstcluster=mythor", "overwrite=1", "nowait=1",
            "format=csv", "srcfile=/data/weather.csv", "dstname=~zzlc::csv::weather",
        ]);
        assert_eq!(plan.execution, Execution::Monitored);
    }

    #[test]
    fn spray_directory_uses_wildcard_and_nosplit() {
        let op = Operation::SprayDirectory(SprayDirectoryRequest {
            source_directory: PathBuf::from("/data/weather02"),
            logical_filename: String::from("~zzlc::json::weather"),
            cluster: String::from("mythor"),
            overwrite: false,
            prefix: Some(String::from("FILENAME,FILESIZE")),
            delete_source_directory: false,
        });

        let plan = op.plan(&base());
        assert_eq!(args(&plan), vec![
            "server=1.2.3.4", "action=spray", "dstcluster=mythor", "overwrite=0", "nowait=1",
            "srcfile=/data/weather02/*", "dstname=~zzlc::json::weather", "PREFIX=FILENAME,FILESIZE", "nosplit=1",
        ]);
    }

    #[test]
    fn despray_with_explicit_ip() {
        let op = Operation::Despray(DesprayRequest {
            logical_filename: String::from("~zzlc::out"),
            destination_file: PathBuf::from("/var/lib/out.csv"),
            destination_ip: Some(String::from("10.0.0.7")),
        });

        let plan = op.plan(&base());
        assert_eq!(args(&plan), vec![
            "server=1.2.3.4", "action=despray", "srcname=~zzlc::out", "dstfile=/var/lib/out.csv",
            "dstip=10.0.0.7", "overwrite=1", "nowait=1",
        ]);
    }

    #[test]
    fn despray_defaults_to_some_local_address() {
        let op = Operation::Despray(DesprayRequest {
            logical_filename: String::from("~zzlc::out"),
            destination_file: PathBuf::from("/tmp/out.csv"),
            destination_ip: None,
        });

        let plan = op.plan(&base());
        let ip = plan.command.value_of("dstip").unwrap();
        assert!(ip.parse::<std::net::IpAddr>().is_ok());
    }

    #[test]
    fn delete_list_and_poll_plans() {
        let delete = Operation::Delete { logical_filename: String::from("~zzlc::old") }.plan(&base());
        assert_eq!(args(&delete), vec!["server=1.2.3.4", "action=remove", "name=~zzlc::old"]);
        assert_eq!(delete.execution, Execution::Once(ParserKind::Delete));

        let list = Operation::List { filemask: String::from("zzlc*") }.plan(&base());
        assert_eq!(args(&list), vec!["server=1.2.3.4", "action=list", "name=zzlc*"]);
        assert_eq!(list.execution, Execution::Once(ParserKind::Listing(String::from("zzlc*"))));

        let poll = Operation::Poll { logical_filename: String::from("zzlc::csv::*") }.plan(&base());
        assert_eq!(poll.execution, Execution::FileWait(String::from("zzlc::csv::*")));
    }

    #[test]
    fn listing_parser_reports_files() {
        let mut parser = ParserKind::Listing(String::from("zzlc*")).create();
        parser.process_line("List zzlc*");
        parser.process_line("zzlc::csv::farm_data_rel");
        parser.process_line("zzlc::json::weather");

        match parser.into_report() {
            Report::Listed { files, has_errors } => {
                assert_eq!(files, vec!["zzlc::csv::farm_data_rel", "zzlc::json::weather"]);
                assert!(!has_errors);
            },
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[test]
    fn sprayed_directory_is_removed_on_request() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("batch");
        std::fs::create_dir(&source).unwrap();
        std::fs::write(source.join("part1.csv"), "a,b\n").unwrap();

        let op = Operation::SprayDirectory(SprayDirectoryRequest {
            source_directory: source.clone(),
            logical_filename: String::from("~zzlc::batch"),
            cluster: String::from("mythor"),
            overwrite: true,
            prefix: None,
            delete_source_directory: true,
        });

        op.after_success().unwrap();
        assert!(!source.exists());
    }
}
