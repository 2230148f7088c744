use base64::{prelude::BASE64_STANDARD, Engine};
use percent_encoding::percent_decode_str;
pub use url::Url;

use crate::config::UrlSwitch;

/// 将相对地址解析为绝对地址，无法解析时原样返回
///
/// `url` 的 join 会同时折叠 `.` 和 `..` 路径段。
pub fn resolve_url(base: Option<&Url>, href: &str) -> String {
    let href = href.trim();

    if href.starts_with("data:") {
        return href.to_string();
    }

    match base {
        Some(base) => match base.join(href) {
            Ok(joined) => joined.to_string(),
            Err(_) => href.to_string(),
        },
        None => match Url::parse(href) {
            Ok(parsed) => parsed.to_string(),
            Err(_) => href.to_string(),
        },
    }
}

/// 按配置的替换表改写地址
pub fn switch_url(url: &str, switches: &[UrlSwitch]) -> String {
    let mut result = url.to_string();
    for switch in switches {
        if !switch.from.is_empty() {
            result = result.replace(&switch.from, &switch.to);
        }
    }
    result
}

/// 地址的主机是否属于给定域名（含子域名）
pub fn host_within_domains(src: &str, domains: &[String]) -> bool {
    let host = match Url::parse(src.trim()) {
        Ok(url) => match url.host_str() {
            Some(host) => host.to_lowercase(),
            None => return false,
        },
        Err(_) => return false,
    };

    domains.iter().any(|domain| {
        let domain = domain.trim().to_lowercase();
        !domain.is_empty() && (host == domain || host.ends_with(&format!(".{}", domain)))
    })
}

/// 解析 Content-Type 格式的字符串，返回 (媒体类型, 字符集, 是否 base64)
pub fn parse_content_type(content_type: &str) -> (String, String, bool) {
    let mut media_type = String::new();
    let mut charset = String::new();
    let mut is_base64 = false;

    let parts: Vec<&str> = content_type.split(';').collect();

    if !parts.is_empty() {
        media_type = parts[0].trim().to_lowercase();
    }

    for part in parts.iter().skip(1) {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("charset=") {
            charset = value.trim_matches('"').to_string();
        } else if part == "base64" {
            is_base64 = true;
        }
    }

    (media_type, charset, is_base64)
}

/// 解码 data URL，返回 (媒体类型, 数据)
pub fn parse_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.trim().strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let (media_type, _charset, is_base64) = parse_content_type(meta);

    let data = if is_base64 {
        let cleaned: String = percent_decode_str(payload)
            .decode_utf8_lossy()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        BASE64_STANDARD.decode(cleaned.as_bytes()).ok()?
    } else {
        percent_decode_str(payload).collect()
    };

    Some((media_type, data))
}
