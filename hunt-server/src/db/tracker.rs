//! 数据库连接状态跟踪
//!
//! 进程级单例，`connected` 只由驱动事件驱动更新 (single-writer)，
//! 其他代码路径只读快照，避免轮询与事件更新之间的竞争。

use parking_lot::RwLock;
use shared::DriverState;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::db::driver::{DriverEvent, StoreDriver};

/// 进程级连接状态
#[derive(Debug)]
struct ConnectionState {
    /// 是否已连接 — 只由事件处理器与 update_connection_status 写入
    connected: bool,
    /// 驱动原始连接状态镜像
    raw_state: DriverState,
    /// 数据库主机 (仅连接时非空)
    host: Option<String>,
    /// 数据库名称 (仅连接时非空)
    database: Option<String>,
}

/// 连接状态快照 (纯读取，无副作用)
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub connected: bool,
    pub state: u8,
    pub state_description: &'static str,
    pub host: Option<String>,
    pub database: Option<String>,
}

/// 连接状态跟踪器
///
/// 进程启动时通过 [`spawn_monitor`](Self::spawn_monitor) 绑定驱动事件流一次；
/// 事件处理器是 `connected` 的唯一常态写入方。
pub struct ConnectionTracker {
    driver: Arc<dyn StoreDriver>,
    state: RwLock<ConnectionState>,
}

impl ConnectionTracker {
    /// 创建跟踪器，初始状态为未连接
    pub fn new(driver: Arc<dyn StoreDriver>) -> Self {
        Self {
            driver,
            state: RwLock::new(ConnectionState {
                connected: false,
                raw_state: DriverState::Disconnected,
                host: None,
                database: None,
            }),
        }
    }

    /// 依据驱动当前 ready-state 重新推导连接标志
    ///
    /// best-effort 读取，总是成功。返回推导后的连接标志。
    pub fn update_connection_status(&self) -> bool {
        let raw = self.driver.ready_state();
        let mut state = self.state.write();
        state.raw_state = raw;
        state.connected = raw == DriverState::Connected;
        if !state.connected {
            state.host = None;
            state.database = None;
        }
        state.connected
    }

    /// 当前连接标志 (纯读取)
    pub fn is_connected(&self) -> bool {
        self.state.read().connected
    }

    /// 状态快照 (纯读取)
    pub fn snapshot(&self) -> StatusSnapshot {
        let state = self.state.read();
        StatusSnapshot {
            connected: state.connected,
            state: state.raw_state.as_u8(),
            state_description: state.raw_state.description(),
            host: state.host.clone(),
            database: state.database.clone(),
        }
    }

    /// 启动事件监听任务
    ///
    /// 订阅驱动事件流 (只注册一次)，按事件更新连接状态并记录日志。
    /// 该任务不负责调度重连 — 重连只由重连器的漏斗触发。
    pub fn spawn_monitor(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let tracker = Arc::clone(self);
        let mut events = tracker.driver.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(DriverEvent::Connected { host, database }) => {
                        tracing::info!("✅ MongoDB connection established");
                        let mut state = tracker.state.write();
                        state.connected = true;
                        state.raw_state = DriverState::Connected;
                        state.host = Some(host);
                        state.database = Some(database);
                    }
                    Ok(DriverEvent::Error(e)) => {
                        tracing::error!("❌ MongoDB connection error: {}", e);
                        let mut state = tracker.state.write();
                        state.connected = false;
                        state.raw_state = tracker.driver.ready_state();
                        state.host = None;
                        state.database = None;
                    }
                    Ok(DriverEvent::Disconnected) => {
                        tracing::warn!("⚠️ MongoDB connection lost");
                        let mut state = tracker.state.write();
                        state.connected = false;
                        state.raw_state = DriverState::Disconnected;
                        state.host = None;
                        state.database = None;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // 落后于事件流时直接从驱动重新推导
                        tracing::warn!("Connection monitor lagged, skipped {} events", skipped);
                        tracker.update_connection_status();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
