//! HTML 文档元数据
//!
//! 提取 `<title>` 文本和 `<meta>` 中声明的字符编码。

use markup5ever_rcdom::Handle;

use crate::utils::url::parse_content_type;

use super::dom::{find_nodes, get_node_attr, get_text};

/// 获取文档标题
///
/// 返回第一个 `title` 标签的全部文本，不做裁剪；文档没有 `title` 时返回 `None`。
pub fn get_title(node: &Handle) -> Option<String> {
    find_nodes(node, &["title"]).first().map(get_text)
}

/// 获取文档字符编码
///
/// 支持 `<meta charset="...">` 和
/// `<meta http-equiv="content-type" content="text/html; charset=...">` 两种写法。
pub fn get_charset(node: &Handle) -> Option<String> {
    for meta_node in find_nodes(node, &["meta"]).iter() {
        if let Some(charset) = get_node_attr(meta_node, "charset") {
            return Some(charset);
        }

        if get_node_attr(meta_node, "http-equiv")
            .unwrap_or_default()
            .eq_ignore_ascii_case("content-type")
        {
            if let Some(content) = get_node_attr(meta_node, "content") {
                let (_media_type, charset, _is_base64) = parse_content_type(&content);
                if !charset.is_empty() {
                    return Some(charset);
                }
            }
        }
    }

    None
}
