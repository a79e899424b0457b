mod cli;
mod infra;
mod routes;
mod server;

use runlist_core::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
