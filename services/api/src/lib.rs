mod cli;
mod infra;
mod routes;
mod rules;
mod server;

use claim_resolution::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
