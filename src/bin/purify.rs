use anyhow::{anyhow, Context as _, Result};
use clap::Parser;
use derive_more::Display;
use log::{info, LevelFilter};
use purifier::{ConfigStore, JsonStorageAdapter, Purifier};
use purifier_shared::types::Error;
use simple_logger::SimpleLogger;
use std::fs;
use std::io::{self, Read};

#[derive(Debug, Parser)]
#[clap(name = "purify", version = "0.1.0", about = "Purifies untrusted HTML")]
struct Cli {
    /// File to purify. Reads from stdin when omitted.
    file: Option<String>,

    /// JSON file with settings that override the defaults
    #[clap(short = 'c', long = "config")]
    config: Option<String>,

    /// Overrides a single setting, as key=value
    #[clap(short = 's', long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Prints every correction to stderr
    #[clap(short = 'e', long = "errors")]
    errors: bool,

    /// Raises the log level, can be repeated
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Display)]
enum Source {
    #[display("stdin")]
    Stdin,
    #[display("{_0}")]
    File(String),
}

impl Source {
    fn read(&self) -> std::result::Result<String, Error> {
        let bytes = match self {
            Source::Stdin => {
                let mut bytes = vec![];
                io::stdin().read_to_end(&mut bytes)?;
                bytes
            }
            Source::File(path) => fs::read(path)?,
        };
        Ok(String::from_utf8(bytes)?)
    }
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    SimpleLogger::new()
        .with_level(level(args.verbose))
        .init()
        .map_err(|err| anyhow!("could not set up logging: {err}"))?;

    let store = match &args.config {
        Some(path) => ConfigStore::with_storage(Box::new(JsonStorageAdapter::try_from(path)?))?,
        None => ConfigStore::new()?,
    };
    for assignment in &args.set {
        let Some((key, value)) = assignment.split_once('=') else {
            return Err(anyhow!("expected key=value, got {assignment}"));
        };
        store.set_from_str(key.trim(), value.trim())?;
    }

    let purifier = Purifier::from_store(&store)?;

    let source = args.file.map_or(Source::Stdin, Source::File);
    info!("purifying {source}");
    let html = source
        .read()
        .with_context(|| format!("could not read {source}"))?;

    if args.errors {
        let purified = purifier.purify_with_report(&html);
        for report in &purified.diagnostics {
            eprintln!("{report}");
        }
        println!("{}", purified.html);
    } else {
        println!("{}", purifier.purify(&html));
    }

    Ok(())
}
