use clap::Parser;

use s2s_harness::cli::{Args, Commands};
use s2s_harness::commands::{self, RunOptions};
use s2s_harness::error;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => {
            std::process::exit(code);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run() -> error::Result<i32> {
    // Logs go to stderr so `--json` output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("S2S_HARNESS_LOG").unwrap_or_else(|_| "info".to_string()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Run {
            scenarios,
            all,
            vars,
            region,
            json,
            keep_workdir,
        } => {
            commands::run_scenarios(RunOptions {
                scenarios,
                all,
                vars,
                region,
                json,
                keep_workdir,
            })
            .await
        }
        Commands::List { json } => {
            commands::list_scenarios(json)?;
            Ok(0)
        }
        Commands::Config { action } => {
            commands::handle_config_command(action)?;
            Ok(0)
        }
        Commands::Doctor => Ok(if commands::run_doctor()? { 0 } else { 1 }),
        Commands::Destroy {
            scenario,
            prefix,
            vars,
            region,
        } => {
            commands::destroy_scenario(&scenario, &prefix, &vars, region)?;
            Ok(0)
        }
    }
}
