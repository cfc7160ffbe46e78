mod cli;
mod client;
mod output;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use client::CellgeoClient;
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.format.unwrap_or_default();
    let client = CellgeoClient::new(&cli.server)?;

    match &cli.command {
        Commands::Lookup(args) => {
            let lookup = client
                .lookup(args.mcc, args.mnc, args.lac, args.cellid)
                .await?;
            output::print_lookup(&lookup, format);
        }
        Commands::Status => status(&client, &cli.server).await?,
        Commands::Stats => {
            let stats = client.stats().await?;
            output::print_stats(&stats, format);
        }
        Commands::Reconcile(args) => {
            let report = client.reconcile(&args.tier).await?;
            output::print_report(&report, format);
        }
        Commands::Refresh(args) => {
            let report = client.refresh(&args.tier, args.max_age_secs).await?;
            output::print_refresh(&report, format);
        }
    }

    Ok(())
}

async fn status(client: &CellgeoClient, server: &str) -> Result<()> {
    let (code, body) = client.health().await?;
    if code != 200 {
        println!(
            "{} {} returned {} {}",
            "✗".red(),
            server.cyan(),
            code.to_string().red(),
            body
        );
        return Ok(());
    }

    println!("{} {} is {}", "✓".green(), server.cyan(), "healthy".green());
    let version = client.version().await?;
    println!("  {}: {}", "Server version".cyan(), version.server);
    match version.data_version {
        Some(ts) => println!("  {}: {}", "Dataset modified".cyan(), ts),
        None => println!("  {}: {}", "Dataset modified".cyan(), "n/a".dimmed()),
    }
    Ok(())
}
