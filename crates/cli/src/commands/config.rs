use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use orderlens_core::config::{AppConfig, ConfigOverrides};
use toml::Value;

use crate::commands::{load_config, CommandResult};

struct Field<'a> {
    key_path: &'a str,
    value: String,
    env_keys: &'a [&'a str],
}

pub fn run() -> CommandResult {
    let config = match load_config("config", ConfigOverrides::default()) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn fields(config: &AppConfig) -> Vec<Field<'static>> {
    let tiers = config
        .report
        .weight_tiers
        .iter()
        .map(|tier| format!("{}>{}", tier.name, tier.lower_bound))
        .collect::<Vec<_>>()
        .join(",");
    let schemes = config
        .report
        .recency_schemes
        .iter()
        .map(|scheme| format!("{scheme:?}"))
        .collect::<Vec<_>>()
        .join(",");

    vec![
        Field {
            key_path: "database.url",
            value: config.database.url.clone(),
            env_keys: &["ORDERLENS_DATABASE_URL"],
        },
        Field {
            key_path: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["ORDERLENS_DATABASE_MAX_CONNECTIONS"],
        },
        Field {
            key_path: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["ORDERLENS_DATABASE_TIMEOUT_SECS"],
        },
        Field {
            key_path: "source.orders_path",
            value: config.source.orders_path.display().to_string(),
            env_keys: &["ORDERLENS_SOURCE_ORDERS_PATH"],
        },
        Field {
            key_path: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["ORDERLENS_SERVER_BIND_ADDRESS"],
        },
        Field {
            key_path: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["ORDERLENS_SERVER_PORT"],
        },
        Field {
            key_path: "server.graceful_shutdown_secs",
            value: config.server.graceful_shutdown_secs.to_string(),
            env_keys: &["ORDERLENS_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        },
        Field {
            key_path: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["ORDERLENS_LOGGING_LEVEL", "ORDERLENS_LOG_LEVEL"],
        },
        Field {
            key_path: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["ORDERLENS_LOGGING_FORMAT", "ORDERLENS_LOG_FORMAT"],
        },
        Field { key_path: "report.weight_tiers", value: tiers, env_keys: &[] },
        Field { key_path: "report.recency_schemes", value: schemes, env_keys: &[] },
        Field {
            key_path: "report.base_date",
            value: config.report.base_date.clone(),
            env_keys: &["ORDERLENS_REPORT_BASE_DATE"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("orderlens.toml"), PathBuf::from("config/orderlens.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, field_source};

    #[test]
    fn file_source_is_reported_for_nested_keys() {
        let doc: Value = "[report]\nbase_date = \"2025-01-01T00:00:00Z\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "report.base_date"));
        assert!(!contains_path(&doc, "report.weight_tiers"));
        assert_eq!(
            field_source("report.base_date", &[], Some(&doc), None),
            "file (config file)".to_string()
        );
        assert_eq!(field_source("server.port", &[], Some(&doc), None), "default".to_string());
    }
}
