use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::thresholds::{
    ReportThresholds, ThresholdError, WeightTier, DEFAULT_BASE_DATE, DEFAULT_RECENCY_SCHEMES,
    DEFAULT_WEIGHT_TIERS,
};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub report: ReportConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SourceConfig {
    pub orders_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Raw report thresholds as configured; `thresholds()` validates them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportConfig {
    pub weight_tiers: Vec<WeightTier>,
    pub recency_schemes: Vec<Vec<u32>>,
    pub base_date: String,
}

impl ReportConfig {
    pub fn thresholds(&self) -> Result<ReportThresholds, ThresholdError> {
        ReportThresholds::from_parts(
            self.weight_tiers.clone(),
            &self.recency_schemes,
            &self.base_date,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub orders_path: Option<PathBuf>,
    pub server_port: Option<u16>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub base_date: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
    #[error("report thresholds are invalid: {0}")]
    Thresholds(#[from] ThresholdError),
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            weight_tiers: DEFAULT_WEIGHT_TIERS
                .iter()
                .map(|(name, lower_bound)| WeightTier::new(*name, *lower_bound))
                .collect(),
            recency_schemes: DEFAULT_RECENCY_SCHEMES.iter().map(|scheme| scheme.to_vec()).collect(),
            base_date: DEFAULT_BASE_DATE.to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://orderlens.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            source: SourceConfig { orders_path: PathBuf::from("data/orders.json") },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 3000,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            report: ReportConfig::default(),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("orderlens.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Validated thresholds for the report stages.
    pub fn report_thresholds(&self) -> Result<ReportThresholds, ConfigError> {
        Ok(self.report.thresholds()?)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(source) = patch.source {
            if let Some(orders_path) = source.orders_path {
                self.source.orders_path = orders_path;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(report) = patch.report {
            if let Some(weight_tiers) = report.weight_tiers {
                self.report.weight_tiers = weight_tiers;
            }
            if let Some(recency_schemes) = report.recency_schemes {
                self.report.recency_schemes = recency_schemes;
            }
            if let Some(base_date) = report.base_date {
                self.report.base_date = base_date;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ORDERLENS_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("ORDERLENS_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("ORDERLENS_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("ORDERLENS_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("ORDERLENS_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ORDERLENS_SOURCE_ORDERS_PATH") {
            self.source.orders_path = PathBuf::from(value);
        }

        if let Some(value) = read_env("ORDERLENS_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("ORDERLENS_SERVER_PORT") {
            self.server.port = parse_u16("ORDERLENS_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("ORDERLENS_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("ORDERLENS_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("ORDERLENS_LOGGING_LEVEL").or_else(|| read_env("ORDERLENS_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ORDERLENS_LOGGING_FORMAT").or_else(|| read_env("ORDERLENS_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("ORDERLENS_REPORT_BASE_DATE") {
            self.report.base_date = value;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(orders_path) = overrides.orders_path {
            self.source.orders_path = orders_path;
        }
        if let Some(server_port) = overrides.server_port {
            self.server.port = server_port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(base_date) = overrides.base_date {
            self.report.base_date = base_date;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_source(&self.source)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        self.report.thresholds()?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("orderlens.toml"), PathBuf::from("config/orderlens.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_source(source: &SourceConfig) -> Result<(), ConfigError> {
    if source.orders_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("source.orders_path must not be empty".to_string()));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    source: Option<SourcePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
    report: Option<ReportPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SourcePatch {
    orders_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct ReportPatch {
    weight_tiers: Option<Vec<WeightTier>>,
    recency_schemes: Option<Vec<Vec<u32>>>,
    base_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::thresholds::{ReportThresholds, ThresholdError};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn write_config(dir: &TempDir, contents: &str) -> Result<std::path::PathBuf, String> {
        let path = dir.path().join("orderlens.toml");
        fs::write(&path, contents).map_err(|err| err.to_string())?;
        Ok(path)
    }

    #[test]
    fn defaults_yield_the_standard_report_thresholds() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;
        let thresholds =
            config.report_thresholds().map_err(|err| format!("thresholds failed: {err}"))?;

        ensure(thresholds == ReportThresholds::default(), "defaults should match")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_ORDERLENS_BASE_DATE", "2025-06-30T00:00:00Z");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[report]
base_date = "${TEST_ORDERLENS_BASE_DATE}"
"#,
            )?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.report.base_date == "2025-06-30T00:00:00Z",
                "base date should be interpolated from environment",
            )?;
            let thresholds =
                config.report_thresholds().map_err(|err| format!("thresholds failed: {err}"))?;
            ensure(thresholds.base_date_ms() == 1_751_241_600_000, "base date should parse")
        })();

        clear_vars(&["TEST_ORDERLENS_BASE_DATE"]);
        result
    }

    #[test]
    fn report_tables_load_from_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(
            &dir,
            r#"
[report]
recency_schemes = [[3, 7, 14, 28]]

[[report.weight_tiers]]
name = "vip"
lower_bound = 5000

[[report.weight_tiers]]
name = "regular"
lower_bound = 0
"#,
        )?;

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;
        let thresholds =
            config.report_thresholds().map_err(|err| format!("thresholds failed: {err}"))?;

        ensure(thresholds.weight_tiers().classify(5001).name == "vip", "vip tier should apply")?;
        ensure(thresholds.weight_tiers().classify(5000).name == "regular", "bound is exclusive")?;
        ensure(thresholds.recency_schemes().len() == 1, "one scheme configured")?;
        ensure(thresholds.recency_schemes()[0].key() == "3week", "scheme key from first bound")
    }

    #[test]
    fn invalid_scheme_is_rejected_at_load_time() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(
            &dir,
            r#"
[report]
recency_schemes = [[7, 14, 21]]
"#,
        )?;

        match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }) {
            Ok(_) => Err("expected threshold validation failure".to_string()),
            Err(error) => ensure(
                matches!(
                    error,
                    ConfigError::Thresholds(ThresholdError::SchemeLength { ref boundaries })
                        if boundaries == &vec![7, 14, 21]
                ),
                "failure should name the short scheme",
            ),
        }
    }

    #[test]
    fn empty_tier_table_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(
            &dir,
            r#"
[report]
weight_tiers = []
"#,
        )?;

        let result =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() });
        ensure(
            matches!(result, Err(ConfigError::Thresholds(ThresholdError::EmptyTiers))),
            "empty tier table should fail",
        )
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ORDERLENS_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("ORDERLENS_SOURCE_ORDERS_PATH", "env/orders.json");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[database]
url = "sqlite://from-file.db"

[source]
orders_path = "file/orders.json"

[logging]
level = "warn"
"#,
            )?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.source.orders_path == std::path::Path::new("env/orders.json"),
                "env orders path should win over file and defaults",
            )
        })();

        clear_vars(&["ORDERLENS_DATABASE_URL", "ORDERLENS_SOURCE_ORDERS_PATH"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ORDERLENS_LOG_LEVEL", "warn");
        env::set_var("ORDERLENS_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )
        })();

        clear_vars(&["ORDERLENS_LOG_LEVEL", "ORDERLENS_LOG_FORMAT"]);
        result
    }

    #[test]
    fn invalid_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ORDERLENS_SERVER_PORT", "not-a-port");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected env override failure".to_string()),
            Err(error) => ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. } if key == "ORDERLENS_SERVER_PORT"
                ),
                "failure should name the env var",
            ),
        };

        clear_vars(&["ORDERLENS_SERVER_PORT"]);
        result
    }
}
