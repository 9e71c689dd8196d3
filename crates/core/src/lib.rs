pub mod config;
pub mod domain;
pub mod errors;
pub mod feed;
pub mod report;
pub mod thresholds;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::customer::CustomerId;
pub use domain::order::{Order, OrderId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use feed::{parse_order_feed, parse_order_records, FeedOrder, OrderFeed};
pub use report::{
    build_report, build_report_from_feed, DashboardReport, DashboardRuntime,
    DeterministicDashboardRuntime,
};
pub use thresholds::{RecencyScheme, ReportThresholds, ThresholdError, WeightTier, WeightTiers};
