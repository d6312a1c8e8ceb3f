use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    agent_bridge::cli::run_cli().await
}
