//! 统一错误响应体
//!
//! 数据库守卫中间件返回的 503 响应体，客户端据此识别连接性错误。

use serde::{Deserialize, Serialize};

/// 数据库不可用时的标准错误标识
///
/// 客户端错误分类器通过该标识 (或 503 状态码) 判定连接性错误
pub const DB_UNAVAILABLE_ERROR: &str = "Database connection unavailable";

/// 错误响应体
///
/// ```json
/// {
///   "error": "Database connection unavailable",
///   "message": "The server is unable to process your request...",
///   "details": { "readyState": 0, ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// 错误标识
    pub error: String,
    /// 面向用户的错误消息
    pub message: String,
    /// 详细诊断信息 (按需开启)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = Some(details);
        self
    }
}

/// 错误详细诊断信息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    /// 驱动原始连接状态
    pub ready_state: u8,
    /// 连接状态描述
    pub ready_state_description: String,
    /// 生成时间 (ISO-8601)
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_details_camel_case() {
        let body = ErrorBody::new(DB_UNAVAILABLE_ERROR, "try later").with_details(ErrorDetails {
            ready_state: 0,
            ready_state_description: "disconnected".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
        });

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], DB_UNAVAILABLE_ERROR);
        assert_eq!(json["details"]["readyState"], 0);
        assert_eq!(json["details"]["readyStateDescription"], "disconnected");
    }

    #[test]
    fn test_error_body_without_details() {
        let body = ErrorBody::new("Route not found", "no such route");
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("details").is_none());
    }
}
