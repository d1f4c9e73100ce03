//! Serves the progress tools for one learner over MCP on stdin/stdout.
//!
//! A tutoring agent launches this as a subprocess so its model can read and
//! advance the learner's curriculum while teaching.

use anyhow::Context;
use clap::Parser;
use outlrn_core::{
    progress::{ProgressStore, validate_learner_ids},
    storage::FileStorage,
    tools::ProgressToolService,
};
use rmcp::{ServiceExt, transport::stdio};
use std::{path::PathBuf, sync::Arc};
use tracing::{Level, info};

#[derive(Parser, Debug)]
#[command(version, about = "MCP server exposing one learner's curriculum progress")]
struct Args {
    #[arg(long)]
    student_id: String,
    #[arg(long)]
    company_id: String,
    /// Directory holding the progress blobs; shared with the API service.
    #[arg(long, default_value = "./data/progress")]
    progress_dir: PathBuf,
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    validate_learner_ids(&args.student_id, &args.company_id)?;

    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let store = ProgressStore::new(Arc::new(FileStorage::new(args.progress_dir.clone())));
    let tools = ProgressToolService::new(store, args.student_id.clone(), args.company_id.clone());

    info!(
        student_id = %args.student_id,
        company_id = %args.company_id,
        progress_dir = %args.progress_dir.display(),
        "Serving progress tools over stdio."
    );
    let service = tools
        .serve(stdio())
        .await
        .context("Failed to start MCP server")?;
    service.waiting().await?;

    info!("MCP client disconnected.");
    Ok(())
}
