//! Dashboard HTTP surface.
//!
//! `GET /get-data` refreshes the store from the configured feed file and answers with the report
//! computed from everything stored, so repeated calls converge on the same data.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use orderlens_core::errors::{ApplicationError, InterfaceError};
use orderlens_core::feed::parse_order_feed;
use orderlens_core::report::{build_report, DashboardReport};
use orderlens_core::thresholds::ReportThresholds;
use orderlens_db::repositories::OrderRepository;
use serde::Serialize;
use tracing::{info, warn};

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub struct DashboardState {
    repository: Arc<dyn OrderRepository>,
    orders_path: PathBuf,
    thresholds: Arc<ReportThresholds>,
}

impl DashboardState {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        orders_path: PathBuf,
        thresholds: Arc<ReportThresholds>,
    ) -> Self {
        Self { repository, orders_path, thresholds }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardEnvelope {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DashboardReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

pub fn router(state: DashboardState) -> Router {
    Router::new().route("/", get(index)).route("/get-data", get(get_data)).with_state(state)
}

async fn index() -> &'static str {
    "orderlens dashboard API"
}

async fn get_data(State(state): State<DashboardState>) -> (StatusCode, Json<DashboardEnvelope>) {
    let correlation_id = next_correlation_id();

    match refresh_dashboard(&state, &correlation_id).await {
        Ok(report) => (
            StatusCode::OK,
            Json(DashboardEnvelope {
                status: StatusCode::OK.as_u16(),
                message: "dashboard data loaded".to_string(),
                data: Some(report),
                correlation_id: None,
            }),
        ),
        Err(error) => {
            let error = error.into_interface(correlation_id);
            warn!(
                event_name = "dashboard.get_data.failed",
                correlation_id = error.correlation_id(),
                error = %error,
                "dashboard request failed"
            );
            let status = status_for(&error);
            (
                status,
                Json(DashboardEnvelope {
                    status: status.as_u16(),
                    message: error.user_message().to_string(),
                    data: None,
                    correlation_id: Some(error.correlation_id().to_string()),
                }),
            )
        }
    }
}

/// Imports the feed file into the store, then aggregates every stored order.
pub async fn refresh_dashboard(
    state: &DashboardState,
    correlation_id: &str,
) -> Result<DashboardReport, ApplicationError> {
    let raw = tokio::fs::read_to_string(&state.orders_path).await.map_err(|error| {
        ApplicationError::Source(format!(
            "could not read `{}`: {error}",
            state.orders_path.display()
        ))
    })?;
    let feed = parse_order_feed(&raw)?;

    let summary = state
        .repository
        .import(&feed.orders)
        .await
        .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
    info!(
        event_name = "dashboard.import.completed",
        correlation_id,
        orders = summary.orders,
        customers = summary.customers,
        apps = summary.apps,
        items = summary.items,
        "order feed imported"
    );

    let orders = state
        .repository
        .list_orders()
        .await
        .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
    let report = build_report(&orders, &state.thresholds)?;
    info!(
        event_name = "dashboard.report.completed",
        correlation_id,
        stored_orders = orders.len(),
        months = report.sorted_weights.len(),
        "dashboard report computed"
    );

    Ok(report)
}

fn status_for(error: &InterfaceError) -> StatusCode {
    match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn next_correlation_id() -> String {
    format!("req-{:06}", REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}
