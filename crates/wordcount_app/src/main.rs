mod cli;
mod commands;
mod settings;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use counter_logging::{engine_error, engine_info, parse_level};
use wordcount_engine::EngineHandle;

use crate::cli::{Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            engine_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut settings = settings::load_settings(cli.config.as_deref())?;
    cli.apply_overrides(&mut settings);

    counter_logging::initialize(
        settings.log.destination,
        parse_level(&settings.log.level),
        settings.log.file.as_deref(),
    );
    engine_info!("Starting with store {:?}", settings.store_path);

    let engine = EngineHandle::start(settings.engine_config())?;
    let mut stdout = io::stdout().lock();

    let result = match &cli.command {
        Command::Count { kind, inputs, .. } => commands::count(&engine, kind, inputs, &mut stdout),
        Command::Stats { word } => commands::stats(&engine, word, &mut stdout).map(|()| true),
        Command::Top { n } => commands::top(&engine, *n, &mut stdout).map(|()| true),
        Command::Health => commands::health(&engine, &mut stdout),
    };

    engine.shutdown();
    result
}
