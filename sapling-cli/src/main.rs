use std::{fs, path::Path, process};

use clap::Parser;
use sapling_core::{config::ParameterSet, phases::generate};
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

mod cli;
mod error;
mod exitcode;
mod report;

use cli::Cli;
use error::{CliError, CliResult};
use report::Summary;

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    match run(&cli) {
        Ok(()) => process::exit(exitcode::OK),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(e.exit_code());
        }
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    let mut params = match &cli.preset {
        Some(path) => load_preset(path)?,
        None => ParameterSet::default(),
    };
    if cli.limit_import {
        params = params.limited_import();
    }
    if let Some(seed) = cli.seed {
        params.seed = seed;
    }

    if let Some(path) = &cli.save_preset {
        params.validate()?;
        return save_preset(path, &params);
    }

    let generation = generate(&params, params.seed)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&generation)?);
    } else {
        print!("{}", Summary::new(&generation, params.seed));
    }
    Ok(())
}

fn load_preset(path: &Path) -> CliResult<ParameterSet> {
    debug!(path = %path.display(), "loading preset");
    let text = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ParameterSet::from_json(&text)?)
}

fn save_preset(path: &Path, params: &ParameterSet) -> CliResult<()> {
    if path.exists() {
        return Err(CliError::PresetExists(path.to_path_buf()));
    }
    fs::write(path, params.to_json()?).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "preset saved");
    Ok(())
}

/// Installs the stderr subscriber. `RUST_LOG`, when set, takes precedence
/// over the `-d` count.
fn setup_logging(verbosity: u8) {
    let level = verbosity_level(verbosity);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();

    match level {
        LevelFilter::INFO => info!("Debug mode: info"),
        LevelFilter::DEBUG => debug!("Debug mode: debug"),
        LevelFilter::TRACE => debug!("Debug mode: trace"),
        _ => {}
    }
}

fn verbosity_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        3 => LevelFilter::TRACE,
        _ => {
            eprintln!("Don't be crazy, max is -d -d -d");
            LevelFilter::TRACE
        }
    }
}
