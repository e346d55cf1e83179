use lorekeep_domain::LorekeepError;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,lorekeep=debug";

/// Set `LOREKEEP_LOG_FORMAT=json` for one JSON object per line.
pub const LOG_FORMAT_VAR: &str = "LOREKEEP_LOG_FORMAT";

/// Install the global tracing subscriber.
///
/// Safe to call more than once; later calls are ignored so tests and the
/// binary can share the same bootstrap.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var(LOG_FORMAT_VAR).is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = if json { builder.json().try_init() } else { builder.try_init() };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Convert a `LorekeepError` into a stable label suitable for logging and
/// response bodies.
#[inline]
pub fn error_label(error: &LorekeepError) -> &'static str {
    match error {
        LorekeepError::Database(_) => "database",
        LorekeepError::Config(_) => "config",
        LorekeepError::Timeout(_) => "timeout",
        LorekeepError::RateLimit(_) => "rate_limit",
        LorekeepError::NotFound(_) => "not_found",
        LorekeepError::InvalidInput(_) => "invalid_input",
        LorekeepError::Internal(_) => "internal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(error_label(&LorekeepError::Database("x".into())), "database");
        assert_eq!(error_label(&LorekeepError::InvalidInput("x".into())), "invalid_input");
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing();
        init_tracing();
    }
}
