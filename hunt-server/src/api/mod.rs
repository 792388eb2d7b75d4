//! HTTP API 模块
//!
//! 每个子模块提供一个 `router()`，由 `build_app` 统一挂载。

pub mod health;
pub mod status;
