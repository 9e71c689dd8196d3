use std::path::PathBuf;

use orderlens_core::config::ConfigOverrides;
use orderlens_core::errors::ApplicationError;
use orderlens_core::feed::parse_order_feed;
use orderlens_db::connection::connect_with_config;
use orderlens_db::migrations;
use orderlens_db::repositories::{OrderRepository, SqlOrderRepository};

use crate::commands::{build_runtime, load_config, read_input, CommandResult};

pub fn run(input: Option<PathBuf>) -> CommandResult {
    let config = match load_config("import", ConfigOverrides::default()) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let path = input.unwrap_or_else(|| config.source.orders_path.clone());

    let parsed =
        read_input(&path).and_then(|raw| parse_order_feed(&raw).map_err(ApplicationError::from));
    let feed = match parsed {
        Ok(feed) => feed,
        Err(error) => return CommandResult::from_application_error("import", error),
    };

    let runtime = match build_runtime("import") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let summary = SqlOrderRepository::new(pool.clone())
            .import(&feed.orders)
            .await
            .map_err(|error| ("persistence", error.to_string(), 8u8))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(summary)
    });

    match result {
        Ok(summary) => CommandResult::success(
            "import",
            format!(
                "imported {} orders from {} (customers={}, apps={}, items={})",
                summary.orders,
                path.display(),
                summary.customers,
                summary.apps,
                summary.items
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("import", error_class, message, exit_code)
        }
    }
}
