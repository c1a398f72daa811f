use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use nix::sys::signal::{SigSet, Signal};

use dfu_monitor::config::{self, DEFAULT_CONFIG_PATH};
use dfu_monitor::dfuplus::parsers::DeleteState;
use dfu_monitor::dfuplus::spray_format::SprayFormat;
use dfu_monitor::error::{Error, Result};
use dfu_monitor::log_plain;
use dfu_monitor::logging;
use dfu_monitor::operations::{DesprayRequest, Executor, Operation, Report, SprayDirectoryRequest, SprayRequest};

const SOURCE: &'static str = "core";

fn logical_name_arg() -> Arg<'static, 'static> {
    Arg::with_name("name")
        .long("name")
        .takes_value(true)
        .required(true)
        .help("Logical file name")
}

fn cluster_arg() -> Arg<'static, 'static> {
    Arg::with_name("cluster")
        .long("cluster")
        .takes_value(true)
        .required(true)
        .help("Destination cluster")
}

fn overwrite_arg() -> Arg<'static, 'static> {
    Arg::with_name("overwrite")
        .long("overwrite")
        .help("Overwrite an existing logical file")
}

fn cli() -> App<'static, 'static> {
    App::new("dfu-monitor")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Runs dfuplus file operations and waits for them to finish")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(Arg::with_name("config")
            .short("c")
            .long("config")
            .takes_value(true)
            .default_value(DEFAULT_CONFIG_PATH)
            .help("Path to the JSON configuration"))
        .subcommand(SubCommand::with_name("spray")
            .about("Sprays a file and waits for the workunit")
            .arg(Arg::with_name("file").long("file").takes_value(true).required(true))
            .arg(logical_name_arg())
            .arg(cluster_arg())
            .arg(overwrite_arg())
            .arg(Arg::with_name("format")
                .long("format")
                .takes_value(true)
                .help("Record format as JSON, e.g. {\"format\": \"fixed\", \"record_size\": 100}")))
        .subcommand(SubCommand::with_name("spray-dir")
            .about("Sprays all files of a directory into one logical file")
            .arg(Arg::with_name("dir").long("dir").takes_value(true).required(true))
            .arg(logical_name_arg())
            .arg(cluster_arg())
            .arg(overwrite_arg())
            .arg(Arg::with_name("prefix").long("prefix").takes_value(true))
            .arg(Arg::with_name("delete-source")
                .long("delete-source")
                .help("Remove the directory after a successful spray")))
        .subcommand(SubCommand::with_name("despray")
            .about("Desprays a logical file and waits for the workunit")
            .arg(logical_name_arg())
            .arg(Arg::with_name("file").long("file").takes_value(true).required(true))
            .arg(Arg::with_name("ip").long("ip").takes_value(true)))
        .subcommand(SubCommand::with_name("delete")
            .about("Removes a logical file")
            .arg(logical_name_arg()))
        .subcommand(SubCommand::with_name("list")
            .about("Lists logical files matching a mask")
            .arg(Arg::with_name("mask").long("mask").takes_value(true).required(true)))
        .subcommand(SubCommand::with_name("poll")
            .about("Waits until a logical file matching a mask exists")
            .arg(logical_name_arg()))
}

fn value(m: &ArgMatches, name: &str) -> String {
    String::from(m.value_of(name).unwrap_or(""))
}

fn operation(matches: &ArgMatches) -> Result<Operation> {
    let op = match matches.subcommand() {
        ("spray", Some(m)) => {
            let format = match m.value_of("format") {
                Some(raw) => Some(serde_json::from_str::<SprayFormat>(raw)?),
                None => None,
            };
            Operation::Spray(SprayRequest {
                source_file: PathBuf::from(value(m, "file")),
                logical_filename: value(m, "name"),
                cluster: value(m, "cluster"),
                overwrite: m.is_present("overwrite"),
                format,
            })
        },
        ("spray-dir", Some(m)) => Operation::SprayDirectory(SprayDirectoryRequest {
            source_directory: PathBuf::from(value(m, "dir")),
            logical_filename: value(m, "name"),
            cluster: value(m, "cluster"),
            overwrite: m.is_present("overwrite"),
            prefix: m.value_of("prefix").map(String::from),
            delete_source_directory: m.is_present("delete-source"),
        }),
        ("despray", Some(m)) => Operation::Despray(DesprayRequest {
            logical_filename: value(m, "name"),
            destination_file: PathBuf::from(value(m, "file")),
            destination_ip: m.value_of("ip").map(String::from),
        }),
        ("delete", Some(m)) => Operation::Delete { logical_filename: value(m, "name") },
        ("list", Some(m)) => Operation::List { filemask: value(m, "mask") },
        ("poll", Some(m)) => Operation::Poll { logical_filename: value(m, "name") },
        _ => return Err(Error::Config(String::from("No operation given"))),
    };

    Ok(op)
}

/* Prints the result, returns whether the operation succeeded */
fn print_report(report: &Report) -> bool {
    match report {
        Report::Monitored(outcome) => {
            println!("{}", outcome);
            outcome.is_success()
        },
        Report::Deleted(state) => {
            println!("{}", state);
            *state == DeleteState::Deleted
        },
        Report::Listed { files, has_errors } => {
            for file in files {
                println!("{}", file);
            }
            !*has_errors
        },
    }
}

fn stop_signals() -> SigSet {
    let mut signals = SigSet::empty();
    signals.add(Signal::SIGINT);
    signals.add(Signal::SIGTERM);
    signals
}

/* Must run before any other thread is spawned so that every thread inherits the mask.
 * Spawned dfuplus processes start with a clean mask again. */
fn block_stop_signals() -> Result<()> {
    stop_signals()
        .thread_block()
        .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::Other, e)))
}

fn watch_stop_signals(executor: Arc<Executor>) -> Result<()> {
    thread::Builder::new()
        .name(String::from("signals"))
        .spawn(move || {
            let signals = stop_signals();
            while let Ok(signal) = signals.wait() {
                log_plain!(Warning, SOURCE, "Stopping on", &format!("{:?}", signal));
                executor.stop();
            }
        })?;

    Ok(())
}

fn run() -> Result<bool> {
    let matches = cli().get_matches();

    let cfg = config::load(matches.value_of("config").unwrap_or(DEFAULT_CONFIG_PATH))?;
    logging::set_threshold(cfg.log_level);
    if let Err(e) = logging::log_startup_message() {
        log_plain!(Warning, SOURCE, "Journal is not available", &e.to_string());
    }

    let op = operation(&matches)?;
    block_stop_signals()?;
    let executor = Arc::new(Executor::start(&cfg)?);
    watch_stop_signals(executor.clone())?;

    let report = executor.execute(&op);
    executor.shutdown();

    Ok(print_report(&report?))
}

fn main() {
    match run() {
        Ok(true) => (),
        Ok(false) => process::exit(1),
        Err(e) => {
            log_plain!(Critical, SOURCE, &e.to_string());
            process::exit(2);
        },
    }
}
