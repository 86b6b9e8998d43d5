use anyhow::Result;
use meeting_assist::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
