//! Main Entrypoint for the LogiBots Terminal Client
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment and command line.
//! 2. Initializing logging.
//! 3. Restoring the persisted transcript and wiring up the HTTP gateway.
//! 4. Running the interactive flow loop.

mod config;
mod repl;

use anyhow::Context;
use clap::Parser;
use config::Config;
use logibots_core::flow::QuizFlow;
use logibots_core::gateway::HttpDialogueGateway;
use logibots_core::transcript::{TRANSCRIPT_FILE, Transcript};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "logibots", about = "Terminal client for the LogiBots study assistant")]
struct Args {
    /// Override the dialogue backend URL from the environment.
    #[arg(long)]
    backend_url: Option<String>,
    /// Start with an empty transcript instead of restoring the previous one.
    #[arg(long)]
    fresh: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(backend_url) = args.backend_url {
        config.backend_url = backend_url;
    }

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {}",
            config.data_dir.display()
        )
    })?;

    let mut transcript = Transcript::load(config.data_dir.join(TRANSCRIPT_FILE));
    if args.fresh {
        transcript.clear();
    }

    let gateway = HttpDialogueGateway::new(
        config.backend_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("Failed to build the dialogue gateway client")?;

    info!(
        backend_url = %config.backend_url,
        user_id = %config.user_id,
        restored_turns = transcript.len(),
        "Client configured. Starting interactive session..."
    );

    let flow = QuizFlow::new(
        Arc::new(gateway),
        config.user_id.clone(),
        config.subject_id.clone(),
        transcript,
    );

    repl::run(flow).await
}
