//! HTML 元素转换
//!
//! 源文档中只有少数标签会映射到输出：
//!
//! | 源标签 | 输出 |
//! |--------|------|
//! | `object` / `embed` | flash 的 `embed`，或图片类型的 `img` |
//! | `div` / `p` | `p` |
//! | `br` | `br` |
//! | `img` | `img` |
//! | `a` | `a` |
//! | `table` | `table`，只保留 `caption`、`tr`、`th`、`td` |
//! | `iframe` | 视频站点转为 `embed`，其余转为链接 |
//!
//! 其他标签作为透明容器处理：子节点各自转换后并入上层。

use markup5ever_rcdom::Handle;

use crate::error::{TuguaError, TuguaResult};
use crate::prompt::Prompter;
use crate::utils::url::{host_within_domains, resolve_url, Url};

use super::dom::{
    append_child, create_element, create_text, get_node_attr, get_node_name, prepend_child,
    serialize_node,
};
use super::units::{get_obj_size, parse_dimension};
use super::walker::{Converted, TreeConverter};

pub const FLASH_MIME_TYPE: &str = "application/x-shockwave-flash";

/// 转换时用到的选项
pub struct ConvertOptions<'a> {
    /// 解析相对地址的基准
    pub base_url: Option<&'a Url>,
    /// 懒加载图片的地址属性，按顺序优先于 `src`
    pub lazy_image_attrs: &'a [String],
    /// iframe 可转为 flash 的视频站点
    pub video_domains: &'a [String],
    pub prompt_on_unsure: bool,
    pub prompter: &'a dyn Prompter,
}

impl ConvertOptions<'_> {
    fn resolve(&self, href: &str) -> String {
        resolve_url(self.base_url, href)
    }
}

/// 有专门转换规则的标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Object,
    Para,
    Break,
    Image,
    Link,
    Table,
    Frame,
}

impl ElementKind {
    pub fn from_name(name: &str) -> Option<ElementKind> {
        match name {
            "object" | "embed" => Some(ElementKind::Object),
            "div" | "p" => Some(ElementKind::Para),
            "br" => Some(ElementKind::Break),
            "img" => Some(ElementKind::Image),
            "a" => Some(ElementKind::Link),
            "table" => Some(ElementKind::Table),
            "iframe" => Some(ElementKind::Frame),
            _ => None,
        }
    }
}

fn is_object(node: &Handle) -> bool {
    matches!(get_node_name(node), Some("object") | Some("embed"))
}

/// flash 嵌入节点，属性顺序固定
fn flash_embed(src: &str, width: Option<u32>, height: Option<u32>) -> Handle {
    let width = width.map(|w| w.to_string());
    let height = height.map(|h| h.to_string());

    let mut attrs: Vec<(&str, &str)> = vec![("type", FLASH_MIME_TYPE), ("src", src)];
    if let Some(width) = width.as_deref() {
        attrs.push(("width", width));
    }
    if let Some(height) = height.as_deref() {
        attrs.push(("height", height));
    }
    attrs.push(("allowFullScreen", "true"));

    create_element("embed", &attrs)
}

fn image(src: &str) -> Handle {
    create_element("img", &[("alt", ""), ("src", src)])
}

fn param_pairs(node: &Handle) -> Vec<(String, String)> {
    node.children
        .borrow()
        .iter()
        .filter(|child| get_node_name(child) == Some("param"))
        .filter_map(|param| {
            let name = get_node_attr(param, "name")?;
            let value = get_node_attr(param, "value")?;
            if name.is_empty() || value.is_empty() {
                None
            } else {
                Some((name.to_lowercase(), value))
            }
        })
        .collect()
}

impl TreeConverter<'_, '_> {
    pub(super) fn convert_element(
        &mut self,
        kind: ElementKind,
        node: &Handle,
    ) -> TuguaResult<Converted> {
        match kind {
            ElementKind::Object => self.convert_object(node),
            ElementKind::Para => self.convert_para(node),
            ElementKind::Break => self.convert_break(node),
            ElementKind::Image => self.convert_image(node),
            ElementKind::Link => self.convert_link(node),
            ElementKind::Table => self.convert_table(node),
            ElementKind::Frame => self.convert_frame(node),
        }
    }

    fn convert_object(&mut self, node: &Handle) -> TuguaResult<Converted> {
        let nested = node.children.borrow().iter().find(|c| is_object(c)).cloned();
        if let Some(nested) = nested {
            return self.convert_object(&nested);
        }

        let object_type = match get_node_attr(node, "type") {
            Some(t) if !t.is_empty() => t,
            _ => {
                return Err(TuguaError::Structure(format!(
                    "未找到对象类型: {}",
                    serialize_node(node, true)
                )))
            }
        };

        if object_type == FLASH_MIME_TYPE {
            let (mut width, mut height) = get_obj_size(node);
            let mut src = if get_node_name(node) == Some("object") {
                get_node_attr(node, "data")
            } else {
                get_node_attr(node, "src")
            };
            let mut vars: Vec<String> = get_node_attr(node, "flashvars")
                .filter(|v| !v.is_empty())
                .into_iter()
                .collect();

            for (name, value) in param_pairs(node) {
                match name.as_str() {
                    "movie" | "data" | "src" => src = Some(value),
                    "width" => width = parse_dimension(&value).or(width),
                    "height" => height = parse_dimension(&value).or(height),
                    "flashvars" => vars.push(value),
                    _ => {}
                }
            }

            let mut src = match src.filter(|s| !s.trim().is_empty()) {
                Some(src) => src,
                None => {
                    return Err(TuguaError::Structure(format!(
                        "无效的 flash 地址: {}",
                        serialize_node(node, true)
                    )))
                }
            };

            if !vars.is_empty() {
                let separator = if src.contains('?') { '&' } else { '?' };
                src = format!("{}{}{}", src, separator, vars.join("&"));
            }

            let src = self.options.resolve(&src);
            Ok(Converted::Node(flash_embed(&src, width, height)))
        } else if object_type.len() > 6 && object_type.starts_with("image/") {
            let mut src = get_node_attr(node, "data");
            for (name, value) in param_pairs(node) {
                if name == "movie" || name == "src" {
                    src = Some(value);
                }
            }

            match src.filter(|s| !s.trim().is_empty()) {
                Some(src) => Ok(Converted::Node(image(&self.options.resolve(&src)))),
                None => Err(TuguaError::Structure(format!(
                    "无效的图片地址: {}",
                    serialize_node(node, true)
                ))),
            }
        } else {
            tracing::warn!(
                "无法识别的对象类型 '{}': {}",
                object_type,
                serialize_node(node, true)
            );
            Ok(Converted::Nothing)
        }
    }

    fn convert_para(&mut self, node: &Handle) -> TuguaResult<Converted> {
        let children = self.convert_children(node)?;
        if children.is_empty() {
            return Ok(Converted::Nothing);
        }

        let p = create_element("p", &[]);
        for child in &children {
            append_child(&p, child);
        }
        Ok(Converted::Node(p))
    }

    fn convert_break(&mut self, node: &Handle) -> TuguaResult<Converted> {
        if !node.children.borrow().is_empty() {
            let contents = self.convert(node, true)?;
            if !contents.is_empty() {
                return Err(TuguaError::Structure(format!(
                    "br 标签不应包含内容: {}",
                    serialize_node(node, true)
                )));
            }
        }

        Ok(Converted::Node(create_element("br", &[])))
    }

    fn convert_image(&mut self, node: &Handle) -> TuguaResult<Converted> {
        // src 缺失或为空时才看延迟加载属性
        let src = get_node_attr(node, "src")
            .filter(|value| !value.trim().is_empty())
            .or_else(|| {
                self.options
                    .lazy_image_attrs
                    .iter()
                    .filter_map(|attr| get_node_attr(node, attr))
                    .find(|value| !value.trim().is_empty())
            });

        let src = match src {
            Some(src) => src,
            None => {
                return Err(TuguaError::Structure(format!(
                    "无效的图片地址: {}",
                    serialize_node(node, true)
                )))
            }
        };

        if src.trim().to_lowercase().starts_with("file://") {
            return Ok(Converted::Nothing);
        }

        Ok(Converted::Node(image(&self.options.resolve(&src))))
    }

    fn convert_link(&mut self, node: &Handle) -> TuguaResult<Converted> {
        let href = get_node_attr(node, "href").filter(|h| !h.trim().is_empty());
        let children = self.convert_children(node)?;

        match href {
            Some(href) if !children.is_empty() => {
                let href = self.options.resolve(&href);
                let a = create_element("a", &[("href", href.as_str())]);
                for child in &children {
                    append_child(&a, child);
                }
                Ok(Converted::Node(a))
            }
            _ => {
                tracing::warn!("无法识别的链接: {}", serialize_node(node, true));
                Ok(Converted::Fragment(children))
            }
        }
    }

    fn convert_cell(&mut self, node: &Handle, name: &str) -> TuguaResult<Handle> {
        let cell = create_element(name, &[]);
        for child in self.convert_children(node)? {
            append_child(&cell, &child);
        }
        Ok(cell)
    }

    fn convert_row(&mut self, node: &Handle) -> TuguaResult<Handle> {
        let row = create_element("tr", &[]);
        let cells: Vec<Handle> = node.children.borrow().clone();

        for cell in cells.iter() {
            if let Some(name @ ("th" | "td")) = get_node_name(cell) {
                let item = self.convert_cell(cell, name)?;
                append_child(&row, &item);
            }
            if self.is_stopped() {
                break;
            }
        }
        Ok(row)
    }

    fn convert_table(&mut self, node: &Handle) -> TuguaResult<Converted> {
        let table = create_element("table", &[]);
        let mut caption = None;
        let mut rows: Vec<Handle> = Vec::new();

        let children: Vec<Handle> = node.children.borrow().clone();
        for child in children.iter() {
            match get_node_name(child) {
                Some("caption") => caption = Some(child.clone()),
                Some("tr") => rows.push(child.clone()),
                Some("thead" | "tbody" | "tfoot") => rows.extend(
                    child
                        .children
                        .borrow()
                        .iter()
                        .filter(|row| get_node_name(row) == Some("tr"))
                        .cloned(),
                ),
                _ => {}
            }
        }

        for row in rows.iter() {
            let converted = self.convert_row(row)?;
            append_child(&table, &converted);
            if self.is_stopped() {
                break;
            }
        }

        if let Some(caption) = caption {
            let converted = self.convert_cell(&caption, "caption")?;
            prepend_child(&table, &converted);
        }

        Ok(Converted::Node(table))
    }

    fn convert_frame(&mut self, node: &Handle) -> TuguaResult<Converted> {
        let (width, height) = get_obj_size(node);
        let src = match get_node_attr(node, "src").filter(|s| !s.trim().is_empty()) {
            Some(src) => self.options.resolve(&src),
            None => {
                tracing::warn!("无法识别的框架: {}", serialize_node(node, true));
                return Ok(Converted::Nothing);
            }
        };

        if host_within_domains(&src, self.options.video_domains) {
            return Ok(Converted::Node(flash_embed(&src, width, height)));
        }

        tracing::error!("框架 '{}' 已转换为链接", src);
        if self.options.prompt_on_unsure {
            self.options.prompter.gate("框架已转换为链接")?;
        }

        let a = create_element("a", &[("href", src.as_str())]);
        append_child(&a, &create_text(&src));
        Ok(Converted::Node(a))
    }
}
