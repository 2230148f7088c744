//! # Tugua Library
//!
//! 把每日“喷嚏图卦”网页转换为结构统一、按小节划分的 HTML 文档，
//! 同时下载、识别并去重其中的图片。
//!
//! ## 模块组织
//!
//! - `core` - 转换上下文和整篇文档的处理流程
//! - `catalogue` - 按目录页批量转换
//! - `parsers` - HTML 节点转换、遍历、段落重排和输出
//! - `media` - 图片格式识别和笑脸图缓存
//! - `network` - HTTP 下载会话
//! - `config` / `env` - 配置文件和环境变量
//! - `prompt` - 操作员确认策略
//! - `utils` - 地址处理工具

pub mod catalogue;
pub mod config;
pub mod core;
pub mod env;
pub mod error;
pub mod media;
pub mod network;
pub mod parsers;
pub mod prompt;
pub mod utils;

// Re-export commonly used items for convenience
pub use catalogue::{catalogue, BatchSummary};
pub use config::Config;
pub use core::{convert_document, download_tugua, ConversionContext};
pub use error::{TuguaError, TuguaResult};
pub use network::{FetchOptions, Fetcher, Session};
pub use prompt::{default_prompter, AutoConfirm, Prompter, TerminalPrompt};
