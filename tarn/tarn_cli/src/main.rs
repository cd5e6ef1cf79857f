use clap::{Parser, Subcommand};

mod commands;

/// Tarn Command Line Interface
///
/// Drives tarn resource pools: a reuse walkthrough, a concurrent stress run
/// and configuration checking.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk through acquiring, releasing and reusing pooled resources
    Demo(commands::demo::DemoArgs),

    /// Hammer a pool from many threads and verify its accounting
    Stress(commands::stress::StressArgs),

    /// Parse and validate a pool configuration file
    #[clap(name = "check-config")]
    CheckConfig(commands::config::CheckConfigArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo(args) => commands::demo::execute(&args),
        Commands::Stress(args) => commands::stress::execute(&args),
        Commands::CheckConfig(args) => commands::config::execute(&args),
    }
}
