use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

mod args;

use args::{Cli, Commands};
use cli::commands::{disassemble, inspect, run};

fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Run {
            path,
            args,
            config,
            max_call_depth,
            max_steps,
        } => {
            let options = run::RunOptions {
                args: args.clone(),
                config: config.clone(),
                max_call_depth: *max_call_depth,
                max_steps: *max_steps,
            };
            run::run_file(path, &options)
        }
        Commands::Disassemble { path } => disassemble::disassemble_file(path),
        Commands::Inspect { path } => inspect::inspect_file(path),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose);

    match dispatch(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
