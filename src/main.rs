//! Punto de entrada ("driver").
//!
//! Este módulo selecciona los flujos de entrada y salida, configura el
//! logging y expone una CLI. El código de salida del proceso es el
//! código del primer error de compilación.

use anyhow::{self, Context};
use clap::{crate_version, Arg, ArgAction, Command};
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;

use std::{
    fs::File,
    io::{self, BufRead, BufReader, LineWriter, Write},
    process,
};

fn main() {
    match run() {
        Ok(code) => process::exit(code.value()),
        Err(error) => {
            eprintln!("Error: {:?}", error);
            process::exit(ifjc::error::ErrorCode::Internal.value());
        }
    }
}

fn run() -> anyhow::Result<ifjc::error::ErrorCode> {
    // Parsing de CLI
    let args = Command::new("IFJ25 compiler")
        .version(crate_version!())
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .action(ArgAction::Set)
                .help("Source file ('-' or absent for stdin)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .action(ArgAction::Set)
                .help("Output file ('-' or absent for stdout)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Increase log verbosity"),
        )
        .get_matches();

    let level = match args.get_count("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    SimpleLogger::new()
        .with_level(level)
        .init()
        .context("Failed to initialize logger")?;

    let input = args.get_one::<String>("input").map(String::as_str);
    let output = args.get_one::<String>("output").map(String::as_str);

    let (reader, name): (Box<dyn BufRead>, &str) = match input {
        None | Some("-") => (Box::new(io::stdin().lock()), "<stdin>"),
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open for reading: {}", path))?;

            (Box::new(BufReader::new(file)), path)
        }
    };

    let writer: Box<dyn Write> = match output {
        None | Some("-") => Box::new(io::stdout().lock()),
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to open for writing: {}", path))?;

            Box::new(LineWriter::new(file))
        }
    };

    info!("compiling {}", name);
    let outcome = ifjc::compile(reader, name, writer);

    if !outcome.diagnostics.is_empty() {
        eprint!("{}", outcome.diagnostics);
    }

    info!("finished with exit code {}", outcome.code.value());
    Ok(outcome.code)
}
