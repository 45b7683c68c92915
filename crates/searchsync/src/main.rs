use std::env::var;
use std::io::stderr;
use std::process::ExitCode;

use clap::Parser;
use eyre::Result as EyreResult;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{registry, EnvFilter};

mod cli;
mod config;

use cli::RootCommand;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = setup() {
        eprintln!("Failed to initialize: {err:?}");
        return ExitCode::FAILURE;
    }

    let command = RootCommand::parse();

    match command.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn setup() -> EyreResult<()> {
    let directives = match var("RUST_LOG") {
        Ok(value) if !value.trim().is_empty() => value,
        _ => "searchsync=info,searchsync_=info".to_owned(),
    };

    registry()
        .with(EnvFilter::builder().parse(directives)?)
        .with(layer().with_writer(stderr))
        .init();

    color_eyre::install()?;

    Ok(())
}
