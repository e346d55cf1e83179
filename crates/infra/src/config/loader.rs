//! Configuration loader
//!
//! ## Loading Strategy
//! 1. Start from [`Config::default`]
//! 2. Overlay a config file when one is found: the path in
//!    `LOREKEEP_CONFIG`, or the first hit of [`probe_config_paths`]
//! 3. Overlay individual `LOREKEEP_*` environment variables
//! 4. Validate the result
//!
//! Every layer is optional, so an empty environment yields the defaults.
//!
//! ## Environment Variables
//! - `LOREKEEP_CONFIG`: explicit config file path
//! - `LOREKEEP_BIND_ADDRESS`
//! - `LOREKEEP_DB_PATH`, `LOREKEEP_DB_POOL_SIZE`,
//!   `LOREKEEP_DB_CONNECTION_TIMEOUT_MS`
//! - `LOREKEEP_SAMPLING_INTERVAL_SECS`, `LOREKEEP_PROBE_TIMEOUT_MS`,
//!   `LOREKEEP_SLOW_QUERY_MS`
//! - `LOREKEEP_METRIC_CAPACITY`, `LOREKEEP_ALERT_CAPACITY`,
//!   `LOREKEEP_ALERT_RETENTION_SECS`, `LOREKEEP_ALERT_SWEEP_CRON`,
//!   `LOREKEEP_WINDOW_SWEEP_CRON`
//! - `LOREKEEP_DEGRADED_LATENCY_MS`, `LOREKEEP_UNHEALTHY_LATENCY_MS`,
//!   `LOREKEEP_DEGRADED_CONNECTIONS`, `LOREKEEP_UNHEALTHY_CONNECTIONS`,
//!   `LOREKEEP_DEGRADED_AVG_QUERY_MS`, `LOREKEEP_DEGRADED_SLOW_FRACTION`
//! - `LOREKEEP_ERROR_RATE_WARNING`, `LOREKEEP_ERROR_RATE_CRITICAL`,
//!   `LOREKEEP_SLOW_FRACTION_WARNING`
//! - `LOREKEEP_RATE_LIMIT_API`, `LOREKEEP_RATE_LIMIT_HEALTH`,
//!   `LOREKEEP_RATE_LIMIT_AUTH` as `<max>/<window_ms>`
//! - `LOREKEEP_RATE_LIMIT_KEY`: `address` or `address_agent`
//!
//! ## File Locations
//! The loader probes `lorekeep.{toml,json}` then `config.{toml,json}` in the
//! current directory and next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use lorekeep_domain::{Config, LorekeepError, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_VAR: &str = "LOREKEEP_CONFIG";

/// Load configuration from every layer and validate it.
///
/// # Errors
/// Returns `LorekeepError::Config` if the file named by `LOREKEEP_CONFIG`
/// is missing, any file or variable fails to parse, or validation fails.
pub fn load() -> Result<Config> {
    let explicit = std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from);
    let base = match explicit.or_else(probe_config_paths) {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::debug!("No config file found, starting from defaults");
            Config::default()
        }
    };

    let config = load_from_env_overrides(base)?;
    config.validate()?;
    tracing::info!(
        bind_address = %config.server.bind_address,
        db_path = %config.database.path.display(),
        sampling_interval_secs = config.monitor.sampling_interval_secs,
        "Configuration loaded"
    );
    Ok(config)
}

/// Overlay `LOREKEEP_*` environment variables on `config`.
///
/// Unset variables leave the corresponding field untouched.
///
/// # Errors
/// Returns `LorekeepError::Config` naming the variable that failed to parse.
pub fn load_from_env_overrides(mut config: Config) -> Result<Config> {
    if let Some(addr) = env_var("LOREKEEP_BIND_ADDRESS") {
        config.server.bind_address = addr;
    }

    let db = &mut config.database;
    if let Some(path) = env_var("LOREKEEP_DB_PATH") {
        db.path = PathBuf::from(path);
    }
    override_parsed(&mut db.pool_size, "LOREKEEP_DB_POOL_SIZE")?;
    override_parsed(&mut db.connection_timeout_ms, "LOREKEEP_DB_CONNECTION_TIMEOUT_MS")?;

    let monitor = &mut config.monitor;
    override_parsed(&mut monitor.sampling_interval_secs, "LOREKEEP_SAMPLING_INTERVAL_SECS")?;
    override_parsed(&mut monitor.probe_timeout_ms, "LOREKEEP_PROBE_TIMEOUT_MS")?;
    override_parsed(&mut monitor.slow_query_ms, "LOREKEEP_SLOW_QUERY_MS")?;

    let retention = &mut config.retention;
    override_parsed(&mut retention.metric_capacity, "LOREKEEP_METRIC_CAPACITY")?;
    override_parsed(&mut retention.alert_capacity, "LOREKEEP_ALERT_CAPACITY")?;
    override_parsed(&mut retention.alert_retention_secs, "LOREKEEP_ALERT_RETENTION_SECS")?;
    if let Some(cron) = env_var("LOREKEEP_ALERT_SWEEP_CRON") {
        retention.alert_sweep_cron = cron;
    }
    if let Some(cron) = env_var("LOREKEEP_WINDOW_SWEEP_CRON") {
        retention.window_sweep_cron = cron;
    }

    let t = &mut config.thresholds;
    override_parsed(&mut t.degraded_latency_ms, "LOREKEEP_DEGRADED_LATENCY_MS")?;
    override_parsed(&mut t.unhealthy_latency_ms, "LOREKEEP_UNHEALTHY_LATENCY_MS")?;
    override_parsed(&mut t.degraded_connections, "LOREKEEP_DEGRADED_CONNECTIONS")?;
    override_parsed(&mut t.unhealthy_connections, "LOREKEEP_UNHEALTHY_CONNECTIONS")?;
    override_parsed(&mut t.degraded_avg_query_ms, "LOREKEEP_DEGRADED_AVG_QUERY_MS")?;
    if let Some(raw) = env_var("LOREKEEP_DEGRADED_SLOW_FRACTION") {
        t.degraded_slow_fraction = Some(parse_var("LOREKEEP_DEGRADED_SLOW_FRACTION", &raw)?);
    }
    override_parsed(&mut t.error_rate_warning, "LOREKEEP_ERROR_RATE_WARNING")?;
    override_parsed(&mut t.error_rate_critical, "LOREKEEP_ERROR_RATE_CRITICAL")?;
    override_parsed(&mut t.slow_fraction_warning, "LOREKEEP_SLOW_FRACTION_WARNING")?;

    let limits = &mut config.rate_limits;
    override_parsed(&mut limits.api, "LOREKEEP_RATE_LIMIT_API")?;
    override_parsed(&mut limits.health, "LOREKEEP_RATE_LIMIT_HEALTH")?;
    override_parsed(&mut limits.auth, "LOREKEEP_RATE_LIMIT_AUTH")?;
    override_parsed(&mut limits.key_strategy, "LOREKEEP_RATE_LIMIT_KEY")?;

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `LorekeepError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(LorekeepError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            LorekeepError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| LorekeepError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| LorekeepError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| LorekeepError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(LorekeepError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["lorekeep.toml", "lorekeep.json", "config.toml", "config.json"];

    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

/// Non-empty environment variable, trimmed.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| LorekeepError::Config(format!("Invalid {key} '{raw}': {e}")))
}

fn override_parsed<T>(slot: &mut T, key: &str) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = env_var(key) {
        *slot = parse_var(key, &raw)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use lorekeep_domain::{KeyStrategy, RateLimitRule};
    use serial_test::serial;
    use tempfile::NamedTempFile;

    use super::*;

    fn with_env<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        let result = f();
        for (key, _) in vars {
            std::env::remove_var(key);
        }
        result
    }

    #[test]
    #[serial]
    fn env_overrides_apply_on_top_of_defaults() {
        let config = with_env(
            &[
                ("LOREKEEP_DB_POOL_SIZE", "4"),
                ("LOREKEEP_SLOW_QUERY_MS", "250"),
                ("LOREKEEP_UNHEALTHY_CONNECTIONS", "40"),
                ("LOREKEEP_DEGRADED_SLOW_FRACTION", "0.25"),
                ("LOREKEEP_RATE_LIMIT_API", "20/1000"),
                ("LOREKEEP_RATE_LIMIT_KEY", "address_agent"),
            ],
            || load_from_env_overrides(Config::default()),
        )
        .expect("overrides parse");

        assert_eq!(config.database.pool_size, 4);
        assert_eq!(config.monitor.slow_query_ms, 250);
        assert_eq!(config.thresholds.unhealthy_connections, 40);
        assert_eq!(config.thresholds.degraded_slow_fraction, Some(0.25));
        assert_eq!(config.rate_limits.api, RateLimitRule::new(20, 1_000));
        assert_eq!(config.rate_limits.key_strategy, KeyStrategy::AddressAgent);
        assert_eq!(config.rate_limits.health, RateLimitRule::new(10, 60_000));
    }

    #[test]
    #[serial]
    fn unset_and_blank_variables_leave_defaults() {
        let config = with_env(&[("LOREKEEP_BIND_ADDRESS", "  ")], || {
            load_from_env_overrides(Config::default())
        })
        .expect("no overrides");
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn invalid_number_names_the_variable() {
        let err = with_env(&[("LOREKEEP_DB_POOL_SIZE", "not-a-number")], || {
            load_from_env_overrides(Config::default())
        })
        .expect_err("invalid pool size");
        match err {
            LorekeepError::Config(msg) => assert!(msg.contains("LOREKEEP_DB_POOL_SIZE")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn malformed_rate_limit_is_rejected() {
        let result = with_env(&[("LOREKEEP_RATE_LIMIT_AUTH", "five per minute")], || {
            load_from_env_overrides(Config::default())
        });
        assert!(matches!(result, Err(LorekeepError::Config(_))));
    }

    fn temp_config(contents: &str, extension: &str) -> (NamedTempFile, PathBuf) {
        let mut temp_file = NamedTempFile::new().expect("temp file");
        temp_file.write_all(contents.as_bytes()).expect("write config");
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).expect("copy config");
        (temp_file, path)
    }

    #[test]
    fn load_from_file_toml_overrides_only_named_keys() {
        let (_file, path) = temp_config(
            r#"
[database]
path = "campaigns.db"

[thresholds]
degraded_connections = 30
"#,
            "toml",
        );

        let config = load_from_file(Some(path.clone())).expect("toml config");
        assert_eq!(config.database.path, PathBuf::from("campaigns.db"));
        assert_eq!(config.database.pool_size, 10);
        assert_eq!(config.thresholds.degraded_connections, 30);
        assert_eq!(config.thresholds.unhealthy_connections, 80);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn load_from_file_json() {
        let (_file, path) = temp_config(
            r#"{ "monitor": { "sampling_interval_secs": 5 }, "rate_limits": { "key_strategy": "address_agent" } }"#,
            "json",
        );

        let config = load_from_file(Some(path.clone())).expect("json config");
        assert_eq!(config.monitor.sampling_interval_secs, 5);
        assert_eq!(config.rate_limits.key_strategy, KeyStrategy::AddressAgent);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/lorekeep.toml")));
        assert!(matches!(result, Err(LorekeepError::Config(_))));
    }

    #[test]
    fn parse_config_unsupported_format() {
        let result = parse_config("some content", &PathBuf::from("lorekeep.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }

    #[test]
    fn parse_config_invalid_json() {
        let result = parse_config(r#"{ "this is": "not valid json" "#, Path::new("x.json"));
        assert!(result.is_err(), "Should fail with invalid JSON");
    }
}
