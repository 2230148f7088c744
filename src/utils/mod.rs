//! # 工具模块
//!
//! - `url` - 地址解析、替换表、data URL 解码

pub mod url;

pub use url::{
    host_within_domains, parse_content_type, parse_data_url, resolve_url, switch_url, Url,
};
