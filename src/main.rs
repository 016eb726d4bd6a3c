//! Agenticlaw — agent graph execution engine.
//!
//! Wires storage, the knowledge-graph/memory/scheduler/LLM layers, and the
//! runtime into a single process, then serves the RPC surface (spec §6)
//! over newline-delimited JSON on stdio. Wire framing is intentionally
//! minimal; an embedder wanting HTTP/WebSocket framing wraps
//! `agenticlaw_gateway::route_rpc` directly.

use agenticlaw_core::EventBus;
use agenticlaw_gateway::{route_rpc, to_response, RpcContext};
use agenticlaw_llm::{AnthropicProvider, LlmProvider, MockLlmProvider};
use agenticlaw_memory::{Embedder, HashEmbedder};
use agenticlaw_runtime::{ExecutionGraphBuilder, Runtime};
use agenticlaw_scheduler::Scheduler;
use agenticlaw_storage::{SqliteStorage, StorageBackend};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "agenticlaw", about = "Agent graph execution engine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the RPC surface over stdio: one JSON `{method, params}` request
    /// per line in, one `{ok, result|error}` response per line out.
    Serve {
        /// Path to the SQLite database file (created if missing).
        #[arg(short, long, default_value = "agenticlaw.db")]
        db: PathBuf,
        /// Default model passed to the LLM adapter for newly built agents.
        #[arg(short, long, default_value = "claude-sonnet-4-5")]
        model: String,
        /// Scheduler tick interval in milliseconds.
        #[arg(long, default_value = "1000")]
        tick_ms: u64,
    },
    /// Print the version.
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match Cli::parse().command {
        Some(Commands::Serve { db, model, tick_ms }) => serve(db, model, tick_ms).await,
        Some(Commands::Version) | None => {
            println!("agenticlaw v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn serve(db: PathBuf, model: String, tick_ms: u64) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agenticlaw=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let storage: Arc<dyn StorageBackend> = Arc::new(SqliteStorage::open(&db)?);
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder);
    let provider: Arc<dyn LlmProvider> = match std::env::var("ANTHROPIC_API_KEY") {
        Ok(key) => Arc::new(AnthropicProvider::new(key)),
        Err(_) => {
            tracing::warn!("ANTHROPIC_API_KEY not set; serving with a mock LLM provider");
            Arc::new(MockLlmProvider::new(Vec::new()))
        }
    };

    let builder = ExecutionGraphBuilder::new(storage.clone(), provider, embedder, EventBus::new(), model);
    let scheduler = Arc::new(Scheduler::new(Duration::from_millis(tick_ms)));
    scheduler.start().await;
    let runtime = Runtime::new(builder, scheduler.clone());
    let ctx = RpcContext::new(storage, runtime, scheduler);

    tracing::info!(db = %db.display(), "agenticlaw serving on stdio");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(request) => {
                let method = request["method"].as_str().unwrap_or_default().to_string();
                let params = request.get("params").cloned().unwrap_or(serde_json::Value::Null);
                to_response(route_rpc(&method, params, &ctx).await)
            }
            Err(e) => to_response(Err((-32700, format!("parse error: {e}")))),
        };
        stdout.write_all(response.to_string().as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}
