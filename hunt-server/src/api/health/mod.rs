//! 健康检查路由
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/health | GET | 服务健康检查 (数据库不可用时为 DEGRADED) |
//!
//! # 响应示例
//!
//! ```json
//! {
//!   "status": "OK",
//!   "message": "Movie Hunt Server is running",
//!   "timestamp": "2024-01-01T00:00:00Z",
//!   "database": { "connected": true, "state": "connected", ... }
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use shared::{DatabaseHealth, HealthResponse};

use crate::core::ServerState;

/// 健康检查路由 - 公共路由
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/health", get(health))
}

/// 服务健康检查
///
/// 数据库不可用时不返回错误 — 服务本身仍在运行，
/// 只是以 `DEGRADED` 状态报告受限能力。
pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let snapshot = state.tracker().snapshot();

    let (status, message) = if snapshot.connected {
        ("OK", "Movie Hunt Server is running")
    } else {
        (
            "DEGRADED",
            "Movie Hunt Server is running with limited functionality",
        )
    };

    Json(HealthResponse {
        status: status.to_string(),
        message: message.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        database: DatabaseHealth {
            connected: snapshot.connected,
            state: snapshot.state_description.to_string(),
            host: snapshot.host,
            name: snapshot.database,
        },
    })
}
