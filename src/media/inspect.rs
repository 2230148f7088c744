//! 图片格式与尺寸识别
//!
//! 格式按文件内容判断，尺寸只读取图片头，不解码像素。

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use image::{ImageFormat, ImageReader, ImageResult};
use regex::Regex;

/// 格式对应的常用扩展名
pub fn format_extension(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("img")
}

/// 笑脸图尺寸上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceLimits {
    pub width: u32,
    pub height: u32,
}

/// 已下载图片的描述
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDescriptor {
    pub source_url: String,
    pub on_disk_path: PathBuf,
    pub declared_extension: String,
    /// 无法识别格式时为 `None`，此时也没有尺寸
    pub detected_format: Option<ImageFormat>,
    pub pixel_width: Option<u32>,
    pub pixel_height: Option<u32>,
    pub is_face: bool,
}

impl ImageDescriptor {
    /// 实际格式与扩展名不一致时返回实际格式的扩展名
    pub fn format_mismatch(&self) -> Option<&'static str> {
        self.detected_format
            .filter(|format| !format.extensions_str().contains(&self.declared_extension.as_str()))
            .map(format_extension)
    }
}

/// 读取文件并识别格式和尺寸
///
/// 格式未知时返回没有尺寸的描述；格式已知但图片头损坏、或该格式不支持时返回错误。
pub fn inspect_file(
    source_url: &str,
    path: &Path,
    declared_extension: &str,
    limits: FaceLimits,
) -> ImageResult<ImageDescriptor> {
    let data = fs::read(path)?;
    let detected_format = image::guess_format(&data).ok();
    let size = match detected_format {
        Some(format) => {
            Some(ImageReader::with_format(Cursor::new(&data), format).into_dimensions()?)
        }
        None => None,
    };
    let is_face = size.map_or(false, |(width, height)| {
        width <= limits.width && height <= limits.height
    });

    Ok(ImageDescriptor {
        source_url: source_url.to_string(),
        on_disk_path: path.to_path_buf(),
        declared_extension: declared_extension.to_string(),
        detected_format,
        pixel_width: size.map(|(width, _)| width),
        pixel_height: size.map(|(_, height)| height),
        is_face,
    })
}

/// 统一扩展名写法
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    match ext.as_str() {
        "jpeg" => "jpg".to_string(),
        _ => ext,
    }
}

fn extension_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.(\w+)$").unwrap_or_else(|e| unreachable!("{}", e)))
}

/// 从图片地址推断扩展名
pub fn extension_from_src(src: &str) -> Option<String> {
    let src = src.trim();

    if let Some(rest) = src.strip_prefix("data:image/") {
        let ext: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        return (!ext.is_empty()).then(|| normalize_extension(&ext));
    }

    extension_regex()
        .captures(src)
        .and_then(|caps| caps.get(1))
        .map(|m| normalize_extension(m.as_str()))
}
