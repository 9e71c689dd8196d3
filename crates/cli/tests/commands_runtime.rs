use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use orderlens_cli::commands::{config, import, migrate, report};
use serde_json::Value;
use tempfile::TempDir;

const FEED: &str = r#"{
    "meta": { "version": "1.0", "isSuccess": true },
    "orders": [
        { "id": "ord-1", "orderAt": 1735570800000, "customer": { "id": "cus-a" },
          "app": { "id": "app-1" }, "item": { "id": "itm-1", "price": 2500 } },
        { "id": "ord-2", "orderAt": 1733011200000, "customer": { "id": "cus-b" },
          "item": { "id": "itm-2", "price": 600 } }
    ]
}"#;

#[test]
fn report_prints_dashboard_json() {
    with_env(&[], || {
        let (_dir, input) = write_input(FEED);

        let result = report::run(&input, None, false);
        assert_eq!(result.exit_code, 0, "expected report success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["sortedWeights"]["2024-12"]["super_heavy"]["total"], 2500);
        assert_eq!(payload["sortedWeights"]["2024-12"]["light"]["count"], 1);
        assert_eq!(payload["daysCounts"]["7week"]["1"], 1);
        assert_eq!(payload["daysCounts"]["7week"]["5"], 1);
    });
}

#[test]
fn report_honors_base_date_override() {
    with_env(&[], || {
        let (_dir, input) = write_input(FEED);

        let result = report::run(&input, Some("2025-03-31T00:00:00Z".to_string()), true);
        assert_eq!(result.exit_code, 0, "expected report success: {}", result.output);
        assert!(result.output.contains('\n'), "pretty output should span lines");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["daysCounts"]["60week"]["2"], 2);
        assert_eq!(payload["daysCounts"]["7week"]["5"], 2);
    });
}

#[test]
fn report_rejects_null_orders() {
    with_env(&[], || {
        let (_dir, input) = write_input(r#"{"meta":{},"orders":null}"#);

        let result = report::run(&input, None, false);
        assert_eq!(result.exit_code, 7, "expected malformed input failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "report");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "malformed_input");
    });
}

#[test]
fn report_reports_missing_input_file() {
    with_env(&[], || {
        let result = report::run(&PathBuf::from("does/not/exist.json"), None, false);
        assert_eq!(result.exit_code, 6, "expected source failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "source_unavailable");
    });
}

#[test]
fn report_returns_config_failure_for_invalid_base_date() {
    with_env(&[("ORDERLENS_REPORT_BASE_DATE", "yesterday")], || {
        let (_dir, input) = write_input(FEED);

        let result = report::run(&input, None, false);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn migrate_returns_success_with_in_memory_database() {
    with_env(&[("ORDERLENS_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn import_upserts_feed_into_database_file() {
    let dir = TempDir::new().expect("tempdir");
    let database_url = format!("sqlite://{}", dir.path().join("orders.db").display());
    let input = dir.path().join("orders.json");
    fs::write(&input, FEED).expect("write feed");
    let input_path = input.display().to_string();

    with_env(
        &[
            ("ORDERLENS_DATABASE_URL", database_url.as_str()),
            ("ORDERLENS_SOURCE_ORDERS_PATH", input_path.as_str()),
        ],
        || {
            let first = import::run(None);
            assert_eq!(first.exit_code, 0, "expected import success: {}", first.output);
            let payload = parse_payload(&first.output);
            assert_eq!(payload["command"], "import");
            let message = payload["message"].as_str().unwrap_or_default();
            assert!(message.starts_with("imported 2 orders"), "unexpected message: {message}");
            assert!(message.contains("customers=2, apps=1, items=2"));

            let second = import::run(Some(input.clone()));
            assert_eq!(second.exit_code, 0, "re-import should be idempotent");
        },
    );
}

#[test]
fn import_rejects_malformed_feed_before_touching_database() {
    with_env(&[("ORDERLENS_DATABASE_URL", "sqlite::memory:")], || {
        let (_dir, input) = write_input(r#"{"orders":[{"id":"o-1"}]}"#);

        let result = import::run(Some(input));
        assert_eq!(result.exit_code, 7);
        assert_eq!(parse_payload(&result.output)["error_class"], "malformed_input");
    });
}

#[test]
fn config_reports_env_sources() {
    with_env(&[("ORDERLENS_LOG_LEVEL", "debug")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 0);
        let output = result.output;

        assert!(output.contains("- logging.level = debug (source: env (ORDERLENS_LOG_LEVEL))"));
        assert!(output.contains("- server.port = 3000 (source: default)"));
        assert!(output
            .contains("- report.base_date = 2024-12-31T23:59:59+09:00 (source: default)"));
    });
}

#[test]
fn config_returns_failure_envelope_when_validation_fails() {
    with_env(&[("ORDERLENS_REPORT_BASE_DATE", "yesterday")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

fn write_input(contents: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("orders.json");
    fs::write(&path, contents).expect("write input");
    (dir, path)
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "ORDERLENS_DATABASE_URL",
        "ORDERLENS_DATABASE_MAX_CONNECTIONS",
        "ORDERLENS_DATABASE_TIMEOUT_SECS",
        "ORDERLENS_SOURCE_ORDERS_PATH",
        "ORDERLENS_SERVER_BIND_ADDRESS",
        "ORDERLENS_SERVER_PORT",
        "ORDERLENS_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "ORDERLENS_LOGGING_LEVEL",
        "ORDERLENS_LOGGING_FORMAT",
        "ORDERLENS_LOG_LEVEL",
        "ORDERLENS_LOG_FORMAT",
        "ORDERLENS_REPORT_BASE_DATE",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(test_fn));

    for (key, value) in previous_values {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }

    if let Err(panic) = outcome {
        std::panic::resume_unwind(panic);
    }
}
