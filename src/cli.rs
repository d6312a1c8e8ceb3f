use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::translate::{translate, TranslateMode};
use crate::upstream::{Connector, HttpConnector, RunRequest};

/// Streams a run from a multi-agent orchestration backend and prints the
/// translated protocol records.
#[derive(Parser, Debug)]
#[command(name = "agent-bridge", version, about)]
struct Args {
    /// Upstream run endpoint, e.g. http://localhost:7777/runs
    #[arg(env = "AGENT_BRIDGE_URL")]
    url: String,

    /// Message to send to the agent
    #[arg(short, long)]
    message: String,

    /// Treat the upstream as a team run (delegation tracking)
    #[arg(long)]
    team: bool,

    /// Reuse an existing session
    #[arg(long)]
    session_id: Option<String>,

    /// User identifier forwarded to the backend
    #[arg(long)]
    user_id: Option<String>,

    /// Overall request timeout in seconds
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,

    /// Print records as plain JSON lines instead of SSE data lines
    #[arg(long)]
    jsonl: bool,
}

pub async fn run_cli() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let connector = HttpConnector::new(args.url.clone(), Duration::from_secs(args.timeout_secs))?;

    let mut request = RunRequest::new(args.message.clone());
    request.session_id = args.session_id.clone();
    request.user_id = args.user_id.clone();

    let upstream = connector
        .open(&request)
        .await
        .context("failed to open upstream run stream")?;

    let mode = if args.team {
        TranslateMode::Team
    } else {
        TranslateMode::Agent
    };

    let cancel = CancellationToken::new();
    let mut records = translate(mode, upstream, cancel.clone());

    let abort = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abort.cancel();
        }
    });

    while let Some(record) = records.next().await {
        let wire = record.to_wire();
        if args.jsonl {
            println!("{wire}");
        } else {
            println!("data: {wire}\n");
        }
    }

    Ok(())
}
