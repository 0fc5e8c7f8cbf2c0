//! Subscriber setup for applications embedding the client.
//!
//! The library itself only emits `tracing` events under the
//! `fintablo_core` target; installing a subscriber is the caller's choice.

use tracing_subscriber::EnvFilter;

use crate::error::{ApiError, Result};

/// Default filter: client events at `debug`, everything else at `info`.
pub const DEFAULT_FILTER: &str = "info,fintablo_core=debug";

/// Install a global fmt subscriber.
///
/// `RUST_LOG` wins over `filter` when set. Fails if the filter does not
/// parse or a global subscriber is already installed.
pub fn init(filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::try_new(filter)
            .map_err(|e| ApiError::Config(format!("invalid log filter {filter:?}: {e}")))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| ApiError::Config(format!("failed to install tracing subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_an_error_not_a_panic() {
        let _ = init(DEFAULT_FILTER);
        let err = init(DEFAULT_FILTER).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
