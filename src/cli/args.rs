use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "s2s-harness")]
#[command(
    about = "Provision, verify and tear down Site-to-Site VPN module scenarios against a real AWS account"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Run one or more scenarios")]
    Run {
        #[arg(help = "Scenario name(s) to run")]
        scenarios: Vec<String>,

        #[arg(long, conflicts_with = "scenarios", help = "Run every built-in scenario")]
        all: bool,

        #[arg(
            long = "var",
            value_name = "NAME=VALUE",
            help = "Override an input variable (VALUE may be JSON)"
        )]
        vars: Vec<String>,

        #[arg(long, help = "Region for every selected scenario")]
        region: Option<String>,

        #[arg(long, help = "JSON output")]
        json: bool,

        #[arg(long, help = "Keep the scenario working copy after a clean teardown")]
        keep_workdir: bool,
    },
    #[command(about = "List built-in scenarios")]
    List {
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    #[command(about = "Manage configuration")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
    #[command(about = "Check that required tools and paths are usable")]
    Doctor,
    #[command(about = "Destroy resources left behind by an earlier run")]
    Destroy {
        #[arg(help = "Scenario the resources were created for")]
        scenario: String,

        #[arg(long, help = "Name prefix of the earlier run")]
        prefix: String,

        #[arg(
            long = "var",
            value_name = "NAME=VALUE",
            help = "Variable override the earlier run was made with"
        )]
        vars: Vec<String>,

        #[arg(long, help = "Region the resources live in")]
        region: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    #[command(about = "Show current configuration values")]
    Show,
    #[command(about = "Show config file path")]
    Path,
    #[command(about = "Write a config file with default values")]
    Init,
}
