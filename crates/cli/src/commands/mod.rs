pub mod config;
pub mod import;
pub mod migrate;
pub mod report;

use std::fs;
use std::path::Path;

use orderlens_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use orderlens_core::errors::{ApplicationError, DomainError};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Maps an application failure to its error class and exit code.
    pub fn from_application_error(command: &str, error: ApplicationError) -> Self {
        let (error_class, exit_code) = match &error {
            ApplicationError::Domain(DomainError::MalformedInput(_)) => ("malformed_input", 7),
            ApplicationError::Domain(DomainError::Thresholds(_))
            | ApplicationError::Configuration(_) => ("config_validation", 2),
            ApplicationError::Source(_) => ("source_unavailable", 6),
            ApplicationError::Persistence(_) => ("persistence", 8),
        };
        Self::failure(command, error_class, error.to_string(), exit_code)
    }
}

pub(crate) fn load_config(
    command: &str,
    overrides: ConfigOverrides,
) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() }).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

pub(crate) fn read_input(path: &Path) -> Result<String, ApplicationError> {
    fs::read_to_string(path).map_err(|error| {
        ApplicationError::Source(format!("could not read `{}`: {error}", path.display()))
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
