use crate::apply::{run_apply, ApplyArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use whitelist_relay::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Whitelist Relay",
    about = "Relay whitelist applications from the intake form to the moderators' webhook",
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
    /// Submit one application to a running relay, as the intake form would
    Apply(ApplyArgs),
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
        Command::Apply(args) => run_apply(args).await,
    }
}
