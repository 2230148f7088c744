//! # 网络模块
//!
//! - `session` - HTTP 会话、重试、地址替换和响应改写

pub mod session;

pub use session::{has_content, FetchOptions, Fetcher, ResponseTransform, Session};
