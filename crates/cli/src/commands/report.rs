use std::path::Path;

use orderlens_core::config::ConfigOverrides;
use orderlens_core::errors::ApplicationError;
use orderlens_core::feed::{parse_order_feed, parse_order_records};
use orderlens_core::report::{build_report, DashboardReport};
use orderlens_core::thresholds::ReportThresholds;

use crate::commands::{load_config, read_input, CommandResult};

pub fn run(input: &Path, base_date: Option<String>, pretty: bool) -> CommandResult {
    let overrides = ConfigOverrides { base_date, ..ConfigOverrides::default() };
    let config = match load_config("report", overrides) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let thresholds = match config.report_thresholds() {
        Ok(thresholds) => thresholds,
        Err(error) => {
            return CommandResult::failure("report", "config_validation", error.to_string(), 2)
        }
    };

    let report = match read_input(input).and_then(|raw| aggregate(&raw, &thresholds)) {
        Ok(report) => report,
        Err(error) => return CommandResult::from_application_error("report", error),
    };

    let rendered = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };

    match rendered {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure("report", "serialization", error.to_string(), 9),
    }
}

/// Builds a report from either a feed document or a flat array of order records.
pub fn aggregate(
    raw: &str,
    thresholds: &ReportThresholds,
) -> Result<DashboardReport, ApplicationError> {
    let orders = if raw.trim_start().starts_with('[') {
        parse_order_records(raw)?
    } else {
        parse_order_feed(raw)?.to_orders()
    };

    Ok(build_report(&orders, thresholds)?)
}

#[cfg(test)]
mod tests {
    use orderlens_core::errors::{ApplicationError, DomainError};
    use orderlens_core::thresholds::{ReportThresholds, DEFAULT_BASE_DATE_MS};

    use super::aggregate;

    #[test]
    fn flat_records_and_feed_documents_aggregate_identically() {
        let at = DEFAULT_BASE_DATE_MS - 3 * 86_400_000;
        let records =
            format!(r#"[{{"id":"o-1","orderAt":{at},"customerId":"c-1","itemPrice":900}}]"#);
        let feed = format!(
            r#"{{"orders":[{{"id":"o-1","orderAt":{at},"customer":{{"id":"c-1"}},
                "item":{{"id":"i-1","price":900}}}}]}}"#
        );
        let thresholds = ReportThresholds::default();

        let from_records = aggregate(&records, &thresholds).expect("records report");
        let from_feed = aggregate(&feed, &thresholds).expect("feed report");

        assert_eq!(from_records, from_feed);
        assert_eq!(from_feed.days_counts["7week"].get(1), 1);
    }

    #[test]
    fn null_orders_is_malformed_input() {
        let result = aggregate(r#"{"orders":null}"#, &ReportThresholds::default());
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::MalformedInput(_)))
        ));
    }
}
