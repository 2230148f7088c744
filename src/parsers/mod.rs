//! # 解析器模块
//!
//! - `html` - HTML文档解析、节点转换、段落重排和输出

pub mod html;

pub use html::{get_charset, get_title, serialize_document, walk};
