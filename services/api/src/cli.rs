use crate::report::{run_import, run_rank, ImportArgs, RankArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use rent_ranker::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Rent Ranker",
    about = "Track, score and rank rental listings",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Work with a JSON listing store from the command line
    Listings {
        #[command(subcommand)]
        command: ListingsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ListingsCommand {
    /// Print the stored listings ranked by score or another sort key
    Rank(RankArgs),
    /// Add listings from a CSV file, skipping addresses already tracked
    Import(ImportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Listings {
            command: ListingsCommand::Rank(args),
        } => run_rank(args),
        Command::Listings {
            command: ListingsCommand::Import(args),
        } => run_import(args),
    }
}
