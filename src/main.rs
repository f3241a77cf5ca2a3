use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    healkit_cli::cli::run().await
}
