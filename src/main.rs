//! lockstep - procedural audiovisual intro

use std::process::ExitCode;

use clap::Parser;

use lockstep::app;
use lockstep::cli::Args;
use lockstep::error::Result;
use lockstep::timeline::{AbortReason, DriverState};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // --help and --version print to stdout and succeed
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(&args) {
        Ok(state) => {
            log::info!("Exiting ({:?})", state);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<DriverState> {
    let config = args.run_config()?;
    let params = args.timeline_params()?;

    log::info!(
        "lockstep {}x{}, {} mode{}",
        config.width(),
        config.height(),
        if config.record() { "record" } else { "live" },
        if config.developer() { ", developer" } else { "" }
    );

    let state = if config.record() {
        app::run_record(&config, params, args.recording_config())?
    } else {
        app::run_live(config, params)?
    };

    if state == DriverState::Aborted(AbortReason::UserStop) {
        log::info!("Stopped by user");
    }
    Ok(state)
}
