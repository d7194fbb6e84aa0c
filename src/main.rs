//! Command-line interface for tagquery.
//!
//! Usage:
//!   tagquery [QUERY] [--config FILE] [--output FILE]
//!
//! The query is read from stdin when no argument is given. The document goes
//! to stdout (or the output file); logs go to stderr.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::process::ExitCode;

use clap::{Arg, Command};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use tagquery::release;
use tagquery::settings::Loader;
use tagquery::{Compiler, Generator, Settings, TagQueryError, Vocabulary};

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.logging.filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error: could not install the logger: {}", e);
    }
}

fn read_query(argument: Option<&String>) -> io::Result<String> {
    match argument {
        Some(query) => Ok(query.clone()),
        None => {
            let mut query = String::new();
            io::stdin().read_to_string(&mut query)?;
            Ok(query)
        }
    }
}

fn run(query: &str, settings: &Settings, output: Option<&String>) -> Result<(), TagQueryError> {
    let compiler = Compiler::new(Vocabulary::from_settings(&settings.metatags));
    let program = compiler.compile(query)?.into_program()?;
    let generator = Generator::new(&settings.generator);
    match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            generator.generate(&program, &mut writer)?;
            writer.flush()?;
        }
        None => generator.generate(&program, &mut io::stdout().lock())?,
    }
    let ledger = release::release(program);
    debug!(nodes = ledger.total(), "Released the tree");
    Ok(())
}

fn main() -> ExitCode {
    let matches = Command::new("tagquery")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compiles a tag-search query into a forest tree document")
        .arg(Arg::new("query").help("Query to compile (read from stdin when absent)").index(1))
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Configuration file layered over the defaults"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Write the document to this file instead of stdout"),
        )
        .get_matches();

    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    let settings = match loader.build() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };
    init_logging(&settings);

    let query = match read_query(matches.get_one::<String>("query")) {
        Ok(query) => query,
        Err(e) => {
            error!(%e, "Could not read the query");
            return ExitCode::from(1);
        }
    };
    match run(&query, &settings, matches.get_one::<String>("output")) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
