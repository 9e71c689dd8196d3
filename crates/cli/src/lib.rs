pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "orderlens",
    about = "Orderlens operator CLI",
    long_about = "Aggregate order feeds into dashboard reports, import feeds into the database, \
                  and inspect the effective configuration.",
    after_help = concat!(
        "Examples:\n",
        "  orderlens report --input data/orders.json --pretty\n",
        "  orderlens import\n",
        "  orderlens config"
    )
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Aggregate an order feed file and print the dashboard report as JSON")]
    Report {
        #[arg(long, help = "Order feed document or flat order record array")]
        input: PathBuf,
        #[arg(long, help = "Reference instant for recency buckets (RFC 3339)")]
        base_date: Option<String>,
        #[arg(long, help = "Pretty-print the report JSON")]
        pretty: bool,
    },
    #[command(about = "Upsert an order feed file into the database")]
    Import {
        #[arg(long, help = "Order feed document (defaults to source.orders_path)")]
        input: Option<PathBuf>,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Report { input, base_date, pretty } => {
            commands::report::run(&input, base_date, pretty)
        }
        Command::Import { input } => commands::import::run(input),
        Command::Migrate => commands::migrate::run(),
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
