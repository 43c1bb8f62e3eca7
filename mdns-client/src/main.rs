mod browse;
mod net;
mod output;
mod query;

use std::process::ExitCode;
use clap::{Parser, Subcommand};
use anyhow::Result;

/// Query and browse Multicast DNS on the local link
#[derive(Parser, Debug)]
#[command(name = "mdns-client", version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a hostname (A/AAAA) or a service instance (SRV)
    Query(query::QueryArgs),
    /// Send a PTR query for a service type and print what answers
    Browse(browse::BrowseArgs),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!("mdns_client={0},shared={0}", level))
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let answered = match cli.command {
        Command::Query(args) => query::run(args).await?,
        Command::Browse(args) => browse::run(args).await?,
    };

    Ok(if answered { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
