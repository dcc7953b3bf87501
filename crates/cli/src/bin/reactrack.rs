use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    reactrack_cli::main_entry().await
}
