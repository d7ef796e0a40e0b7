mod apply;
mod cli;
mod infra;
mod routes;
mod server;

use whitelist_relay::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
