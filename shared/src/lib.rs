//! Movie Hunt Shared - 服务端与客户端共享的线上类型
//!
//! 数据库连接状态文档、健康检查文档、统一错误响应体，
//! 以及连接字符串凭据脱敏工具。

pub mod masking;
pub mod response;
pub mod status;

pub use masking::mask_connection_string;
pub use response::{DB_UNAVAILABLE_ERROR, ErrorBody, ErrorDetails};
pub use status::{DatabaseHealth, DbStatus, DriverState, HealthResponse, state_description};
