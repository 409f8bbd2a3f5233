use anyhow::Result;
use clap::Parser;

use sentiscope::{cli::Cli, runtime::Runner, utils::init_logger};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_logger(cli.verbose);

    let runner = Runner::new(cli)?;
    runner.run().await
}
