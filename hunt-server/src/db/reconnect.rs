//! 数据库自动重连
//!
//! 显式状态机：`Idle -> Scheduled -> Attempting -> (Idle | Scheduled | Exhausted)`。
//! 指数退避，尝试次数封顶；任意时刻最多一个待触发定时器 (取消并替换)。
//!
//! 重连只由驱动的 `Disconnected` 事件触发 (单一漏斗)，
//! 连接跟踪器的事件处理不参与调度，避免重复调度。

use parking_lot::Mutex;
use shared::DriverState;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::db::driver::{DriverEvent, StoreDriver};

/// 最大自动重连尝试次数
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
/// 首次重连延迟 (毫秒)
pub const INITIAL_RECONNECT_DELAY_MS: u64 = 1_000;
/// 重连延迟上限 (毫秒)
pub const MAX_RECONNECT_DELAY_MS: u64 = 30_000;

/// 第 `attempt` 次尝试前的退避延迟
///
/// `min(INITIAL * 2^attempt, MAX)`，序列为 1000, 2000, 4000, 8000, 16000 毫秒
pub fn delay_for_attempt(attempt: u32) -> Duration {
    let shifted = INITIAL_RECONNECT_DELAY_MS.saturating_mul(1u64 << attempt.min(16));
    Duration::from_millis(shifted.min(MAX_RECONNECT_DELAY_MS))
}

/// 重连状态机阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPhase {
    /// 空闲 — 无待触发定时器
    Idle,
    /// 已调度 — 定时器等待触发
    Scheduled,
    /// 尝试中 — 正在重建连接
    Attempting,
    /// 尝试耗尽 — 终态，需要 reset_attempts 或重启进程
    Exhausted,
}

/// 重连会话状态
struct ReconnectSession {
    /// 已用尝试次数 0..=MAX_RECONNECT_ATTEMPTS
    attempts: u32,
    phase: ReconnectPhase,
    /// 待触发定时器 — 至多一个，调度时取消并替换
    pending: Option<CancellationToken>,
}

/// 数据库重连器
pub struct Reconnector {
    driver: Arc<dyn StoreDriver>,
    session: Mutex<ReconnectSession>,
}

impl Reconnector {
    pub fn new(driver: Arc<dyn StoreDriver>) -> Self {
        Self {
            driver,
            session: Mutex::new(ReconnectSession {
                attempts: 0,
                phase: ReconnectPhase::Idle,
                pending: None,
            }),
        }
    }

    /// 绑定自动重连 — 订阅驱动的 `Disconnected` 事件 (进程启动时调用一次)
    ///
    /// 这是自动重连的唯一触发入口
    pub fn spawn_auto_reconnect(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let reconnector = Arc::clone(self);
        let mut events = reconnector.driver.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(DriverEvent::Disconnected) => {
                        tracing::warn!("⚠️ MongoDB connection lost, attempting to reconnect...");
                        reconnector.schedule();
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// 调度下一次重连尝试
    ///
    /// 取消已有的待触发定时器后重新调度 (取消并替换)；
    /// 尝试次数达到上限时进入 `Exhausted` 终态。
    pub fn schedule(self: &Arc<Self>) {
        let (delay, attempt) = {
            let mut session = self.session.lock();

            if let Some(token) = session.pending.take() {
                token.cancel();
            }

            if session.phase == ReconnectPhase::Exhausted {
                tracing::debug!("Reconnect attempts exhausted, ignoring disconnect event");
                return;
            }

            if session.attempts >= MAX_RECONNECT_ATTEMPTS {
                session.phase = ReconnectPhase::Exhausted;
                tracing::error!(
                    "❌ Failed to reconnect to MongoDB after {} attempts",
                    MAX_RECONNECT_ATTEMPTS
                );
                tracing::error!("Please check your connection settings and restart the server");
                return;
            }

            let delay = delay_for_attempt(session.attempts);
            session.attempts += 1;
            session.phase = ReconnectPhase::Scheduled;

            let token = CancellationToken::new();
            session.pending = Some(token.clone());

            let attempt = session.attempts;
            let reconnector = Arc::clone(self);
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
                reconnector.run_attempt(attempt).await;
            });

            (delay, attempt)
        };

        tracing::info!(
            "⏳ Attempting to reconnect to MongoDB (attempt {}/{}) in {} seconds...",
            attempt,
            MAX_RECONNECT_ATTEMPTS,
            delay.as_secs_f64()
        );
    }

    /// 定时器触发后的单次重连尝试
    async fn run_attempt(self: Arc<Self>, attempt: u32) {
        {
            let mut session = self.session.lock();
            session.phase = ReconnectPhase::Attempting;
            session.pending = None;
        }

        // 关闭未断开的旧连接再重建
        if self.driver.ready_state() != DriverState::Disconnected {
            self.driver.close().await;
        }

        match self.driver.connect().await {
            Ok(_) => {
                tracing::info!("✅ Successfully reconnected to MongoDB");
                let mut session = self.session.lock();
                session.attempts = 0;
                session.phase = ReconnectPhase::Idle;
                if let Some(token) = session.pending.take() {
                    token.cancel();
                }
            }
            Err(e) => {
                tracing::error!("❌ Reconnection attempt {} failed: {}", attempt, e);
                self.schedule();
            }
        }
    }

    /// 重置重连计数
    ///
    /// 任意时刻可调用：取消待触发定时器、清零尝试次数、回到 `Idle`。
    /// `Exhausted` 终态只能由此重新武装。
    pub fn reset_attempts(&self) {
        let mut session = self.session.lock();
        if let Some(token) = session.pending.take() {
            token.cancel();
        }
        session.attempts = 0;
        session.phase = ReconnectPhase::Idle;
    }

    /// 已用尝试次数
    pub fn attempts(&self) -> u32 {
        self.session.lock().attempts
    }

    /// 当前状态机阶段
    pub fn phase(&self) -> ReconnectPhase {
        self.session.lock().phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::driver::testing::FakeDriver;

    fn setup(connect_ok: bool) -> (Arc<FakeDriver>, Arc<Reconnector>) {
        let driver = FakeDriver::new();
        driver.set_connect_result(connect_ok);
        let reconnector = Arc::new(Reconnector::new(driver.clone() as Arc<dyn StoreDriver>));
        reconnector.spawn_auto_reconnect();
        (driver, reconnector)
    }

    fn assert_close_to(actual: Duration, expected_ms: u64) {
        let expected = Duration::from_millis(expected_ms);
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(50),
            "expected ~{}ms, got {:?}",
            expected_ms,
            actual
        );
    }

    #[test]
    fn test_delay_sequence() {
        let delays: Vec<u64> = (0..7).map(|a| delay_for_attempt(a).as_millis() as u64).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000, 30000, 30000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_until_exhaustion() {
        let (driver, reconnector) = setup(false);
        tokio::task::yield_now().await;

        let start = tokio::time::Instant::now();
        driver.emit(DriverEvent::Disconnected);

        // 足够跑完全部 5 次尝试 (1+2+4+8+16 = 31 秒)
        tokio::time::sleep(Duration::from_secs(60)).await;

        let attempts = driver.connect_attempts();
        assert_eq!(attempts.len(), 5);
        let expected_offsets = [1_000u64, 3_000, 7_000, 15_000, 31_000];
        for (instant, expected) in attempts.iter().zip(expected_offsets) {
            assert_close_to(instant.duration_since(start), expected);
        }
        assert_eq!(reconnector.phase(), ReconnectPhase::Exhausted);

        // 终态：后续断连事件不再触发尝试
        driver.emit(DriverEvent::Disconnected);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(driver.connect_attempts().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_rearms_after_exhaustion() {
        let (driver, reconnector) = setup(false);
        tokio::task::yield_now().await;

        driver.emit(DriverEvent::Disconnected);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(reconnector.phase(), ReconnectPhase::Exhausted);

        reconnector.reset_attempts();
        assert_eq!(reconnector.phase(), ReconnectPhase::Idle);
        assert_eq!(reconnector.attempts(), 0);

        // 重置后首次断连从 1 秒延迟重新开始
        driver.set_connect_result(true);
        let rearm = tokio::time::Instant::now();
        driver.emit(DriverEvent::Disconnected);
        tokio::time::sleep(Duration::from_secs(5)).await;

        let attempts = driver.connect_attempts();
        assert_eq!(attempts.len(), 6);
        assert_close_to(attempts[5].duration_since(rearm), 1_000);
        assert_eq!(reconnector.phase(), ReconnectPhase::Idle);
        assert_eq!(reconnector.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_replace_keeps_single_timer() {
        let (driver, reconnector) = setup(false);
        tokio::task::yield_now().await;

        let start = tokio::time::Instant::now();
        driver.emit(DriverEvent::Disconnected);
        tokio::time::sleep(Duration::from_millis(100)).await;

        // 第二个断连事件取消首个定时器并以更大的延迟重新调度
        driver.emit(DriverEvent::Disconnected);
        tokio::time::sleep(Duration::from_millis(1_400)).await;
        // t=1.5s：原 1s 定时器已被取消，新 2s 定时器未触发
        assert_eq!(driver.connect_attempts().len(), 0);

        tokio::time::sleep(Duration::from_millis(800)).await;
        // t=2.3s：仅新定时器触发了一次尝试，失败后已重新调度
        let attempts = driver.connect_attempts();
        assert_eq!(attempts.len(), 1);
        assert_close_to(attempts[0].duration_since(start), 2_100);
        assert_eq!(reconnector.phase(), ReconnectPhase::Scheduled);
        assert_eq!(reconnector.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_reconnect_resets_counter() {
        let (driver, reconnector) = setup(false);
        tokio::task::yield_now().await;

        driver.emit(DriverEvent::Disconnected);
        // 前两次失败
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(driver.connect_attempts().len(), 2);

        // 第三次成功
        driver.set_connect_result(true);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(driver.connect_attempts().len(), 3);
        assert_eq!(reconnector.phase(), ReconnectPhase::Idle);
        assert_eq!(reconnector.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closes_non_disconnected_connection_before_retry() {
        let (driver, _reconnector) = setup(true);
        tokio::task::yield_now().await;

        // 驱动仍报告 connecting，重试前必须先关闭
        driver.set_ready_state(DriverState::Connecting);
        driver.emit(DriverEvent::Disconnected);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(driver.close_calls(), 1);
        assert_eq!(driver.connect_attempts().len(), 1);
    }
}
