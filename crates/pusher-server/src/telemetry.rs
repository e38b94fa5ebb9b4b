//! Tracing setup.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence; `level` applies to the `pusher` crates
/// otherwise. Returns an error if a subscriber is already installed.
pub fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(format!("pusher={level}").parse()?);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))
}
