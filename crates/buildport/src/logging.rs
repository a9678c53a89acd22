//! Tracing subscriber setup for hosts.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::BuildportError;

/// Installs a global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` is used
/// (e.g. `"buildport=debug,info"`). Fails if a global subscriber is already
/// installed.
pub fn init_tracing(default_directive: &str) -> Result<(), BuildportError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(env_filter)
        .try_init()
        .map_err(|e| BuildportError::Config(format!("tracing: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_second_call_fails() {
        let _ = init_tracing("buildport=debug");
        assert!(matches!(
            init_tracing("buildport=debug"),
            Err(BuildportError::Config(_))
        ));
    }
}
