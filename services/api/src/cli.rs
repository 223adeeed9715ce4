use crate::report::{run_quote, run_rank, QuoteArgs, RankArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use land_engine::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "land-engine",
    about = "Estimate conservation program revenue for land parcels",
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
    /// Quote CRP, EQIP and CSP practices for one parcel
    Quote(QuoteArgs),
    /// Score a parcel CSV and print it ranked by LAS score
    Rank(RankArgs),
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
        Command::Quote(args) => run_quote(args).await,
        Command::Rank(args) => run_rank(args),
    }
}
