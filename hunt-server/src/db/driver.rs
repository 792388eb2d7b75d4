//! 存储驱动抽象
//!
//! [`StoreDriver`] 是连接跟踪与重连机制面向驱动的唯一接口：
//! 连接跟踪器和重连器在进程启动时各订阅一次驱动事件流，
//! 不在每次状态检查时重复注册。
//!
//! [`MongoDriver`] 是 MongoDB 实现，通过周期性 ping 心跳
//! 检测连接丢失并发出生命周期事件。

use async_trait::async_trait;
use mongodb::{Client, bson::doc, options::ClientOptions};
use shared::DriverState;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::utils::{AppError, AppResult};

/// 驱动生命周期事件
///
/// 事件是连接状态的唯一写入来源 (single-writer)：
/// 连接跟踪器消费全部事件，重连器只响应 `Disconnected` (单一漏斗)。
#[derive(Debug, Clone)]
pub enum DriverEvent {
    /// 连接建立
    Connected { host: String, database: String },
    /// 连接丢失
    Disconnected,
    /// 驱动错误
    Error(String),
}

/// 连接成功后的信息
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub host: String,
    pub database: String,
}

/// 存储驱动接口
///
/// # 事件约定
///
/// - `connect` 成功时发出 [`DriverEvent::Connected`]；失败不发事件，
///   由调用方处理 (初始连接失败不触发自动重连)。
/// - `close` 不发事件 — 重连器在重试前关闭旧连接，
///   如果 close 发出 `Disconnected` 会重新进入漏斗造成重复调度。
/// - 只有真实的连接丢失 (心跳失败) 发出 `Disconnected`。
#[async_trait]
pub trait StoreDriver: Send + Sync {
    /// 使用配置的连接字符串建立新连接
    async fn connect(&self) -> AppResult<ConnectionInfo>;

    /// 关闭当前连接 (幂等，不发事件)
    async fn close(&self);

    /// 当前驱动连接状态 (best-effort 读取)
    fn ready_state(&self) -> DriverState;

    /// 订阅驱动生命周期事件
    fn subscribe(&self) -> broadcast::Receiver<DriverEvent>;
}

/// 心跳 ping 超时
const HEARTBEAT_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// MongoDB 驱动
///
/// 内部维护自己的 ready-state 并通过广播通道发出事件。
/// 心跳任务周期性 ping，失败时标记断开并发出 `Disconnected`。
pub struct MongoDriver {
    uri: String,
    connect_timeout: Duration,
    heartbeat_interval: Duration,
    client: parking_lot::RwLock<Option<Client>>,
    state: AtomicU8,
    events: broadcast::Sender<DriverEvent>,
}

impl MongoDriver {
    pub fn new(
        uri: impl Into<String>,
        connect_timeout: Duration,
        heartbeat_interval: Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            uri: uri.into(),
            connect_timeout,
            heartbeat_interval,
            client: parking_lot::RwLock::new(None),
            state: AtomicU8::new(DriverState::Disconnected.as_u8()),
            events,
        })
    }

    fn set_state(&self, state: DriverState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    fn emit(&self, event: DriverEvent) {
        // 没有订阅者时发送失败，忽略即可
        let _ = self.events.send(event);
    }

    async fn ping(client: &Client) -> Result<(), mongodb::error::Error> {
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
    }

    async fn try_connect(&self) -> AppResult<ConnectionInfo> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| AppError::database(format!("Invalid connection string: {e}")))?;
        options.server_selection_timeout = Some(self.connect_timeout);

        let host = options
            .hosts
            .first()
            .map(|h| h.to_string())
            .unwrap_or_default();
        let database = options
            .default_database
            .clone()
            .unwrap_or_else(|| "admin".to_string());

        let client = Client::with_options(options)
            .map_err(|e| AppError::database(format!("Failed to build MongoDB client: {e}")))?;

        Self::ping(&client)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        *self.client.write() = Some(client);
        Ok(ConnectionInfo { host, database })
    }

    /// 启动心跳任务
    ///
    /// 连接存在时周期性 ping；失败时标记断开并发出事件，
    /// 这是 `Disconnected` 事件的唯一来源。
    pub fn spawn_heartbeat(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let driver = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(driver.heartbeat_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;

                if driver.ready_state() != DriverState::Connected {
                    continue;
                }
                let Some(client) = driver.client.read().clone() else {
                    continue;
                };

                let result =
                    tokio::time::timeout(HEARTBEAT_PING_TIMEOUT, Self::ping(&client)).await;
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::error!("❌ MongoDB connection error: {}", e);
                        driver.set_state(DriverState::Disconnected);
                        driver.emit(DriverEvent::Error(e.to_string()));
                        driver.emit(DriverEvent::Disconnected);
                    }
                    Err(_) => {
                        tracing::error!("❌ MongoDB heartbeat timed out");
                        driver.set_state(DriverState::Disconnected);
                        driver.emit(DriverEvent::Disconnected);
                    }
                }
            }
        })
    }
}

#[async_trait]
impl StoreDriver for MongoDriver {
    async fn connect(&self) -> AppResult<ConnectionInfo> {
        self.set_state(DriverState::Connecting);

        // 连接尝试与固定超时赛跑，先到者胜，落败方的结果被忽略
        let result = tokio::time::timeout(self.connect_timeout, self.try_connect()).await;
        match result {
            Ok(Ok(info)) => {
                self.set_state(DriverState::Connected);
                self.emit(DriverEvent::Connected {
                    host: info.host.clone(),
                    database: info.database.clone(),
                });
                Ok(info)
            }
            Ok(Err(e)) => {
                self.set_state(DriverState::Disconnected);
                Err(e)
            }
            Err(_) => {
                self.set_state(DriverState::Disconnected);
                Err(AppError::timeout(
                    "Connection timeout - check network or firewall settings",
                ))
            }
        }
    }

    async fn close(&self) {
        self.set_state(DriverState::Disconnecting);
        let client = self.client.write().take();
        if let Some(client) = client {
            client.shutdown().await;
        }
        self.set_state(DriverState::Disconnected);
    }

    fn ready_state(&self) -> DriverState {
        DriverState::from_u8(self.state.load(Ordering::SeqCst))
            .unwrap_or(DriverState::Disconnected)
    }

    fn subscribe(&self) -> broadcast::Receiver<DriverEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! 测试用驱动 — 事件与连接结果可编程控制

    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    pub(crate) struct FakeDriver {
        state: AtomicU8,
        connect_ok: Mutex<bool>,
        connect_attempts: Mutex<Vec<tokio::time::Instant>>,
        close_calls: AtomicUsize,
        events: broadcast::Sender<DriverEvent>,
    }

    impl FakeDriver {
        pub(crate) fn new() -> Arc<Self> {
            let (events, _) = broadcast::channel(16);
            Arc::new(Self {
                state: AtomicU8::new(DriverState::Disconnected.as_u8()),
                connect_ok: Mutex::new(true),
                connect_attempts: Mutex::new(Vec::new()),
                close_calls: AtomicUsize::new(0),
                events,
            })
        }

        pub(crate) fn emit(&self, event: DriverEvent) {
            let _ = self.events.send(event);
        }

        pub(crate) fn set_ready_state(&self, state: DriverState) {
            self.state.store(state.as_u8(), Ordering::SeqCst);
        }

        pub(crate) fn set_connect_result(&self, ok: bool) {
            *self.connect_ok.lock() = ok;
        }

        pub(crate) fn connect_attempts(&self) -> Vec<tokio::time::Instant> {
            self.connect_attempts.lock().clone()
        }

        pub(crate) fn close_calls(&self) -> usize {
            self.close_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StoreDriver for FakeDriver {
        async fn connect(&self) -> AppResult<ConnectionInfo> {
            self.connect_attempts.lock().push(tokio::time::Instant::now());
            if *self.connect_ok.lock() {
                self.set_ready_state(DriverState::Connected);
                let info = ConnectionInfo {
                    host: "localhost:27017".to_string(),
                    database: "movies".to_string(),
                };
                self.emit(DriverEvent::Connected {
                    host: info.host.clone(),
                    database: info.database.clone(),
                });
                Ok(info)
            } else {
                self.set_ready_state(DriverState::Disconnected);
                Err(AppError::database("simulated connect failure"))
            }
        }

        async fn close(&self) {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
            self.set_ready_state(DriverState::Disconnected);
        }

        fn ready_state(&self) -> DriverState {
            DriverState::from_u8(self.state.load(Ordering::SeqCst))
                .unwrap_or(DriverState::Disconnected)
        }

        fn subscribe(&self) -> broadcast::Receiver<DriverEvent> {
            self.events.subscribe()
        }
    }
}
