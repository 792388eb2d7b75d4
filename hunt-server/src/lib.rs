//! Movie Hunt Server - 电影推荐应用后端
//!
//! # 架构概述
//!
//! 本模块是 Movie Hunt 后端的主入口，提供以下核心功能：
//!
//! - **数据库连接监控** (`db`): 连接状态跟踪、自动重连 (指数退避)
//! - **状态接口** (`api`): `/api/db-status` 与 `/api/health`
//! - **连接守卫** (`db::middleware`): 数据库不可用时的 503 短路
//!
//! # 模块结构
//!
//! ```text
//! hunt-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── db/            # 驱动抽象、连接跟踪、重连
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 错误、日志
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, Server, ServerState};
pub use db::{
    ConnectionTracker, DbAvailable, DbGuardOptions, DbService, DriverEvent, Reconnector,
    StoreDriver, require_db_connection,
};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境 (dotenv + 日志)
///
/// 必须在其他初始化之前调用
pub fn setup_environment() -> AppResult<()> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    utils::logger::init_logger_with_file(log_level.as_deref(), log_dir.as_deref());

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    __  ___           _         __  __            __
   /  |/  /___ _   __(_)__     / / / /_  ______  / /_
  / /|_/ / __ \ | / / / _ \   / /_/ / / / / __ \/ __/
 / /  / / /_/ / |/ / /  __/  / __  / /_/ / / / / /_
/_/  /_/\____/|___/_/\___/  /_/ /_/\__,_/_/ /_/\__/
    "#
    );
}
