//! 数据库连接状态路由
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/db-status | GET | 数据库连接状态诊断 (凭据脱敏) |

use axum::{Json, Router, extract::State, routing::get};
use shared::DbStatus;

use crate::core::ServerState;

/// 故障排查提示 — 随状态文档原样返回给前端展示
const CONNECTION_TIPS: [&str; 5] = [
    "If connection fails, check your MONGODB_URI in .env file",
    "Ensure you have replaced <db_password> with your actual password",
    "Check if your IP address is whitelisted in MongoDB Atlas",
    "Verify that your MongoDB user has the correct permissions",
    "See CONNECTION_INSTRUCTIONS.md for more troubleshooting tips",
];

/// 数据库状态路由 - 公共路由 (诊断用，数据库不可用时也必须可达)
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/db-status", get(db_status))
}

/// 数据库连接状态诊断
///
/// 连接字符串只以脱敏形式返回，原始凭据绝不出现在响应中。
pub async fn db_status(State(state): State<ServerState>) -> Json<DbStatus> {
    let snapshot = state.tracker().snapshot();

    Json(DbStatus {
        connected: snapshot.connected,
        state: Some(snapshot.state),
        state_description: snapshot.state_description.to_string(),
        connection_string: Some(state.db.masked_connection_string()),
        host: snapshot.host,
        database: snapshot.database,
        timestamp: Some(chrono::Utc::now().to_rfc3339()),
        tips: CONNECTION_TIPS.iter().map(|t| t.to_string()).collect(),
        error: None,
    })
}
