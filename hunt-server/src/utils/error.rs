//! 统一错误处理
//!
//! 提供应用级错误类型：
//! - [`AppError`] - 应用错误枚举
//! - [`AppResult`] - 应用结果别名
//!
//! # 使用示例
//!
//! ```ignore
//! // 返回错误
//! Err(AppError::database("connection refused"))
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shared::ErrorBody;
use tracing::error;

/// 应用结果别名
pub type AppResult<T> = Result<T, AppError>;

/// 应用错误枚举
///
/// # 错误分类
///
/// | 分类 | 说明 |
/// |------|------|
/// | 业务逻辑错误 | 资源不存在 |
/// | 系统错误 | 数据库错误、超时、配置错误、内部错误 |
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== 业务逻辑错误 (4xx) ==========
    #[error("Resource not found: {0}")]
    /// 资源不存在 (404)
    NotFound(String),

    // ========== 系统错误 (5xx) ==========
    #[error("Database error: {0}")]
    /// 数据库错误 (500)
    Database(String),

    #[error("{0}")]
    /// 操作超时 (504)
    Timeout(String),

    #[error("Configuration error: {0}")]
    /// 配置错误 (500)
    Config(String),

    #[error("Internal server error: {0}")]
    /// 内部错误 (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_kind, message) = match &self {
            // Not found (404)
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", msg.clone()),

            // Database errors (500)
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error",
                    "An internal database error occurred".to_string(),
                )
            }

            // Timeout (504)
            AppError::Timeout(msg) => {
                error!(target: "timeout", error = %msg, "Operation timed out");
                (StatusCode::GATEWAY_TIMEOUT, "Timeout", msg.clone())
            }

            // Configuration errors (500)
            AppError::Config(msg) => {
                error!(target: "config", error = %msg, "Configuration error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Configuration error",
                    "The server is misconfigured".to_string(),
                )
            }

            // Internal errors (500)
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorBody::new(error_kind, message))).into_response()
    }
}

// ========== Helper Constructors ==========

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
