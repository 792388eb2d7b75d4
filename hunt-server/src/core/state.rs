use std::sync::Arc;

use crate::core::Config;
use crate::db::{ConnectionTracker, DbService};

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | db | Arc<DbService> | 数据库服务 (驱动 + 跟踪器 + 重连器) |
///
/// # 使用示例
///
/// ```ignore
/// // 读取连接状态快照
/// let snapshot = state.tracker().snapshot();
///
/// if state.tracker().is_connected() {
///     println!("数据库已连接");
/// }
/// ```
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 数据库服务
    pub db: Arc<DbService>,
}

impl ServerState {
    /// 创建服务器状态 (手动构造)
    ///
    /// 通常使用 [`initialize()`](Self::initialize) 方法代替
    pub fn new(config: Config, db: Arc<DbService>) -> Self {
        Self { config, db }
    }

    /// 初始化服务器状态
    ///
    /// 初始化数据库服务并启动监控任务。数据库不可用时不会失败，
    /// 服务器以降级模式启动，由重连器负责后续恢复。
    pub async fn initialize(config: &Config) -> Self {
        let db = Arc::new(DbService::initialize(config).await);
        Self::new(config.clone(), db)
    }

    /// 获取连接状态跟踪器
    pub fn tracker(&self) -> &Arc<ConnectionTracker> {
        self.db.tracker()
    }
}
