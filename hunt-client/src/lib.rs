//! Movie Hunt Client - HTTP client for the Movie Hunt server
//!
//! Provides network-based HTTP calls to the server API plus a
//! database status monitor with caching, subscriptions and polling.

pub mod config;
pub mod error;
pub mod http;
pub mod monitor;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, ConnectionErrorInfo, handle_database_connection_error};
pub use http::HttpClient;
pub use monitor::{DatabaseMonitor, PollingHandle, StatusSubscription};

// Re-export shared types for convenience
pub use shared::{DB_UNAVAILABLE_ERROR, DbStatus, ErrorBody, HealthResponse};
