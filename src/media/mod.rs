//! # 图片模块
//!
//! - `inspect` - 识别图片格式和像素尺寸
//! - `cache` - 按日期持久化的笑脸图信息

pub mod cache;
pub mod inspect;

pub use cache::{ImageInfo, ImageInfoStore};
pub use inspect::{
    extension_from_src, format_extension, inspect_file, normalize_extension, FaceLimits,
    ImageDescriptor,
};
