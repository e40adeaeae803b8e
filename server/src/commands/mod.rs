use std::path::PathBuf;

use clap::Subcommand;

use crate::Result;

pub(crate) mod seed;

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the HTTP API
    Serve,
    /// Import meals and ingredients from a CSV export
    Seed {
        #[arg(long)]
        csv: PathBuf,
    },
}

impl Default for Command {
    fn default() -> Self {
        Self::Serve
    }
}

impl Command {
    pub(crate) async fn run(&self) -> Result<()> {
        match &self {
            Command::Serve => crate::http_server::cmd::serve().await,
            Command::Seed { csv } => seed::seed(csv).await,
        }
    }
}
