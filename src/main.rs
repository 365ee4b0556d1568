use anyhow::Result;
use calendar_analyzer::cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    cli::run().await
}
