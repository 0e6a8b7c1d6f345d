//! CLI for pinwatch: poll every PIN node and print one consistent dashboard.

mod commands;
mod display;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pinwatch")]
#[command(about = "pinwatch — status dashboard for PIN intent-network nodes")]
#[command(version = pinwatch_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the configured nodes, their roles and the endpoints polled on each
    Nodes,

    /// Run one fetch cycle and print the dashboard
    Snapshot {
        /// Print the raw snapshot and dashboard figures as JSON
        #[arg(long)]
        json: bool,
    },

    /// Refresh continuously at the configured interval until Ctrl+C
    Watch {
        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u64>,

        /// Emit one JSON line per cycle instead of the dashboard
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = commands::load_config();

    match cli.command {
        Commands::Nodes => commands::nodes::run(&config),
        Commands::Snapshot { json } => commands::snapshot::run(&config, json),
        Commands::Watch { cycles, json } => commands::watch::run(&config, cycles, json),
    }
}
