mod capture;
mod cli;
mod config;
mod event;
mod listing;
mod monitor;
mod notify;
#[cfg(test)]
mod testutil;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
