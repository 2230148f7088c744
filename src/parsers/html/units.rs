//! 尺寸估算
//!
//! 把 CSS 长度和 HTML 宽高属性折算成像素（96dpi，16px 字号）。

use std::sync::OnceLock;

use markup5ever_rcdom::Handle;
use regex::Regex;

use super::dom::get_node_attr;

/// 单位到像素的换算系数，无单位按 px 处理
pub fn unit_factor(unit: Option<&str>) -> f64 {
    match unit {
        None | Some("px") => 1.0,
        Some("em") => 16.0,
        Some("ex") => 8.0,
        Some("in") => 96.0,
        Some("cm") => 37.8,
        Some("mm") => 3.78,
        Some("pt") => 1.33,
        Some("pc") => 16.0,
        Some(_) => 1.0,
    }
}

fn width_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(^|[^\w\-])width\s*:\s*(\d+)\s*(px|em|ex|in|cm|mm|pt|pc)?([^\w\-]|$)")
            .unwrap_or_else(|e| unreachable!("{}", e))
    })
}

fn height_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(^|[^\w\-])height\s*:\s*(\d+)\s*(px|em|ex|in|cm|mm|pt|pc)?([^\w\-]|$)")
            .unwrap_or_else(|e| unreachable!("{}", e))
    })
}

/// 解析属性里的整数尺寸，只取开头的数字部分（如 `480px`、`100%`）
pub fn parse_dimension(value: &str) -> Option<u32> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn style_dimension(re: &Regex, style: &str) -> Option<u32> {
    let caps = re.captures(style)?;
    let number: f64 = caps.get(2)?.as_str().parse().ok()?;
    let factor = unit_factor(caps.get(3).map(|m| m.as_str()));
    Some((number * factor) as u32)
}

/// 估算元素宽高，属性优先，缺失时从 style 中读取
pub fn get_obj_size(node: &Handle) -> (Option<u32>, Option<u32>) {
    let mut width = get_node_attr(node, "width").and_then(|v| parse_dimension(&v));
    let mut height = get_node_attr(node, "height").and_then(|v| parse_dimension(&v));

    let style = match get_node_attr(node, "style") {
        Some(style) if !style.trim().is_empty() => style.to_lowercase(),
        _ => return (width, height),
    };

    if width.is_none() {
        width = style_dimension(width_regex(), &style);
    }
    if height.is_none() {
        height = style_dimension(height_regex(), &style);
    }

    (width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::create_element;

    #[test]
    fn attributes_win_over_style() {
        let node = create_element(
            "iframe",
            &[("width", "480"), ("style", "width: 10in; height: 2in")],
        );
        assert_eq!(get_obj_size(&node), (Some(480), Some(192)));
    }

    #[test]
    fn style_units() {
        let node = create_element("embed", &[("style", "WIDTH:2em;height:10mm")]);
        assert_eq!(get_obj_size(&node), (Some(32), Some(37)));
    }

    #[test]
    fn ignores_prefixed_properties() {
        let node = create_element("embed", &[("style", "max-width: 300px; line-height: 2")]);
        assert_eq!(get_obj_size(&node), (None, None));
    }

    #[test]
    fn lenient_attribute_values() {
        assert_eq!(parse_dimension("480px"), Some(480));
        assert_eq!(parse_dimension(" 100% "), Some(100));
        assert_eq!(parse_dimension("auto"), None);
    }
}
