use std::path::Path;

use anyhow::{Context, Result};
use tourguide_policy_center::LoadedPolicy;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber. `RUST_LOG` wins over `--log-level`;
/// logs go to stderr so stdout stays machine readable.
pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

pub fn load_policy(path: Option<&Path>) -> Result<LoadedPolicy> {
    let loaded = tourguide_policy_center::load_policy(path).with_context(|| match path {
        Some(path) => format!("Failed to load policy from {}", path.display()),
        None => "Failed to load policy".to_string(),
    })?;
    tracing::debug!(
        overrides = loaded
            .provenance
            .values()
            .filter(|source| **source != tourguide_policy_center::PolicySource::Builtin)
            .count(),
        "policy loaded"
    );
    Ok(loaded)
}
