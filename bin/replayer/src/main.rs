//! Main entrypoint for the replayer binary.

use anyhow::Result;
use clap::Parser;
use replayer::{init_tracing_subscriber, ReplayCli};
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cfg = ReplayCli::parse();
    init_tracing_subscriber(cfg.v)?;

    let summary = replayer::run(cfg).await?;

    info!(
        target: "replayer",
        "Replay finished: {} steps, {} submissions, {} calls",
        summary.steps,
        summary.submissions,
        summary.calls
    );
    Ok(())
}
