//! fanout - parallel file digests
//!
//! Computes the SHA-256 digest of every file under the given paths, at most
//! `FANOUT_MAX_PARALLEL` files at a time.

mod digest;

use std::path::PathBuf;

use fanout::{combine, Config, Dispatcher};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fanout=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let dispatcher = Dispatcher::from_config(&config);
    info!("Loaded configuration: max_parallel={}", dispatcher.max_parallel());

    let roots: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if roots.is_empty() {
        anyhow::bail!("usage: fanout PATH...");
    }

    let report = digest::digest_paths(&dispatcher, &roots);
    for (path, digest) in &report.digests {
        println!("{}  {}", digest, path.display());
    }
    info!(
        files = report.digests.len(),
        failures = report.failures.len(),
        "Done"
    );

    match combine(report.failures) {
        Some(errors) => Err(errors.into()),
        None => Ok(()),
    }
}
