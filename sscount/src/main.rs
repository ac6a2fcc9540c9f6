//! `sscount`: count Strand-seq reads in bins and classify strand states.

#![recursion_limit = "1024"]

#[macro_use]
extern crate error_chain;

#[macro_use]
extern crate clap;

#[macro_use]
extern crate slog;
extern crate slog_async;
extern crate slog_term;

extern crate lib_classify;
extern crate lib_shared;

use std::process;
use std::result;
use std::sync::atomic::Ordering;
use std::sync::{atomic, Arc};

use clap::{App, ArgMatches};

use slog::Drain;

mod errors {
    error_chain! {
        links {
            Classify(lib_classify::Error, lib_classify::ErrorKind);
            Shared(lib_shared::errors::Error, lib_shared::errors::ErrorKind);
        }
    }
}

pub use errors::*;

/// Exit code for errors other than failing to write the count table.
const EXIT_FAILURE: i32 = 1;

/// Exit code when the count table could not be written.
const EXIT_OUTPUT_WRITE: i32 = 2;

/// Drain passing on records at or above a level that can be changed at runtime.
///
/// Level 0 is warnings only, 1 is info, anything above is trace.
struct RuntimeLevelFilter<D> {
    drain: D,
    log_level: Arc<atomic::AtomicIsize>,
}

impl<D> Drain for RuntimeLevelFilter<D>
where
    D: Drain,
{
    type Ok = Option<D::Ok>;
    type Err = Option<D::Err>;

    fn log(
        &self,
        record: &slog::Record,
        values: &slog::OwnedKVList,
    ) -> result::Result<Self::Ok, Self::Err> {
        let current_level = match self.log_level.load(Ordering::Relaxed) {
            0 => slog::Level::Warning,
            1 => slog::Level::Info,
            _ => slog::Level::Trace,
        };

        if record.level().is_at_least(current_level) {
            self.drain.log(record, values).map(Some).map_err(Some)
        } else {
            Ok(None)
        }
    }
}

/// Terminal logger with its level taken from `--quiet` and `-v`.
fn build_logger(matches: &ArgMatches) -> slog::Logger {
    let log_level = Arc::new(atomic::AtomicIsize::new(if matches.is_present("quiet") {
        0
    } else {
        1 + matches.occurrences_of("verbose") as isize
    }));

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build();
    let drain = RuntimeLevelFilter {
        drain,
        log_level,
    }
    .fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, o!())
}

fn run(matches: &ArgMatches) -> Result<()> {
    let options = lib_classify::ClassifyOptions::new(matches)?;
    let mut logger = build_logger(matches);
    lib_classify::run(&mut logger, &options)?;
    Ok(())
}

/// Map `e` to the process exit code.
fn exit_code(e: &Error) -> i32 {
    match *e.kind() {
        ErrorKind::Classify(lib_classify::ErrorKind::OutputWrite(_)) => EXIT_OUTPUT_WRITE,
        _ => EXIT_FAILURE,
    }
}

fn main() {
    let yaml = load_yaml!("cli.yaml");
    let matches = App::from_yaml(yaml).get_matches();

    if let Err(ref e) = run(&matches) {
        eprintln!("error: {}", e);
        for cause in e.iter().skip(1) {
            eprintln!("caused by: {}", cause);
        }
        // only with RUST_BACKTRACE=1
        if let Some(backtrace) = e.backtrace() {
            eprintln!("backtrace: {:?}", backtrace);
        }

        process::exit(exit_code(e));
    }
}
