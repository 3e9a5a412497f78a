#![forbid(unsafe_code)]

pub mod app_services;
pub mod dashboard_service;
pub mod error;
pub mod fetch;
pub mod identity;
pub mod score_service;
pub mod status_service;

pub use progress_core::Clock;

pub use app_services::AppServices;
pub use dashboard_service::{DashboardService, DashboardSession};
pub use error::{AppServicesError, DashboardError, ScoreServiceError, StatusSyncError};
pub use fetch::{FetchState, ProgressFetcher};
pub use identity::{Anonymous, Identity, IdentityProvider, StaticIdentity};
pub use score_service::ScoreService;
pub use status_service::{ChapterStatusSession, SelectOutcome, StatusControlService};
