//! 源文档遍历与转换
//!
//! `walk()` 从起始节点出发，按文档顺序依次转换节点本身、后续兄弟节点和
//! 祖先节点的后续兄弟节点，直到停止条件命中或文档结束。
//!
//! 停止条件不会作用于起始节点及其后代；对其余经过的每个节点（包括转换
//! 过程中递归访问到的子节点）都会检查一次。命中后当前转换立即收尾，
//! 命中的节点作为下一次遍历的起点返回。
//!
//! ```rust,ignore
//! let stop = |node: &Handle| subtitle.is_match(node_string(node).unwrap_or_default().trim());
//! let (section, next) = walk(&options, &start, Some(&stop), true)?;
//! ```

use std::rc::Rc;

use markup5ever_rcdom::{Handle, NodeData};

use crate::error::TuguaResult;

use super::dom::{
    append_child, create_element, create_text, get_parent_node, is_descendant_or_self,
    next_sibling,
};
use super::element_handlers::{ConvertOptions, ElementKind};

/// 单个源节点的转换结果
#[derive(Debug)]
pub enum Converted {
    /// 不产生输出
    Nothing,
    /// 一个新节点
    Node(Handle),
    /// 透明容器的子节点，直接并入上层
    Fragment(Vec<Handle>),
}

impl Converted {
    pub fn into_nodes(self) -> Vec<Handle> {
        match self {
            Converted::Nothing => Vec::new(),
            Converted::Node(node) => vec![node],
            Converted::Fragment(nodes) => nodes,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Converted::Nothing => true,
            Converted::Node(_) => false,
            Converted::Fragment(nodes) => nodes.is_empty(),
        }
    }
}

/// 停止条件
pub type StopPredicate<'p> = &'p dyn Fn(&Handle) -> bool;

/// 一次遍历的转换器状态
pub struct TreeConverter<'a, 'p> {
    pub(super) options: &'a ConvertOptions<'a>,
    start: Handle,
    stop: Option<StopPredicate<'p>>,
    stopped: Option<Handle>,
}

impl<'a, 'p> TreeConverter<'a, 'p> {
    pub fn new(
        options: &'a ConvertOptions<'a>,
        start: &Handle,
        stop: Option<StopPredicate<'p>>,
    ) -> Self {
        TreeConverter {
            options,
            start: start.clone(),
            stop,
            stopped: None,
        }
    }

    pub fn stopped(&self) -> Option<&Handle> {
        self.stopped.as_ref()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_some()
    }

    fn should_stop(&self, node: &Handle) -> bool {
        match self.stop {
            Some(stop) => !is_descendant_or_self(node, &self.start) && stop(node),
            None => false,
        }
    }

    /// 转换一个源节点；`ignore_root` 为真时把节点本身当作透明容器
    pub fn convert(&mut self, node: &Handle, ignore_root: bool) -> TuguaResult<Converted> {
        if self.should_stop(node) {
            self.stopped = Some(node.clone());
            return Ok(Converted::Nothing);
        }

        match &node.data {
            NodeData::Comment { .. }
            | NodeData::Doctype { .. }
            | NodeData::ProcessingInstruction { .. } => Ok(Converted::Nothing),
            NodeData::Text { contents } => Ok(convert_text(&contents.borrow())),
            NodeData::Element { name, .. } if !ignore_root => {
                match ElementKind::from_name(name.local.as_ref()) {
                    Some(kind) => self.convert_element(kind, node),
                    None => self.convert_children(node).map(Converted::Fragment),
                }
            }
            _ => self.convert_children(node).map(Converted::Fragment),
        }
    }

    /// 依次转换子节点并展开透明容器，停止条件命中后不再继续
    pub fn convert_children(&mut self, node: &Handle) -> TuguaResult<Vec<Handle>> {
        let children: Vec<Handle> = node.children.borrow().clone();
        let mut result = Vec::new();

        for child in children.iter() {
            result.extend(self.convert(child, false)?.into_nodes());
            if self.is_stopped() {
                break;
            }
        }

        Ok(result)
    }
}

fn convert_text(text: &str) -> Converted {
    let text = text.replace('\u{feff}', "");
    let text = text.trim();

    if text.is_empty() {
        Converted::Nothing
    } else {
        Converted::Node(create_text(text))
    }
}

/// 文档顺序的下一个节点：先找兄弟，没有则逐级向上找祖先的兄弟
fn advance(node: &Handle) -> Option<Handle> {
    let mut cursor = node.clone();
    loop {
        if let Some(sibling) = next_sibling(&cursor) {
            return Some(sibling);
        }
        cursor = get_parent_node(&cursor)?;
    }
}

/// 从 `start` 开始遍历并转换，返回装有结果的 `div` 和命中停止条件的节点
pub fn walk(
    options: &ConvertOptions<'_>,
    start: &Handle,
    stop: Option<StopPredicate<'_>>,
    follow_siblings: bool,
) -> TuguaResult<(Handle, Option<Handle>)> {
    let mut converter = TreeConverter::new(options, start, stop);
    let dest = create_element("div", &[]);
    let mut current = Some(start.clone());

    while let Some(node) = current {
        for converted in converter.convert(&node, false)?.into_nodes() {
            append_child(&dest, &converted);
        }

        if !follow_siblings || converter.is_stopped() {
            break;
        }

        current = advance(&node);
    }

    let stopped = converter.stopped.take();
    debug_assert!(stopped
        .as_ref()
        .map_or(true, |node| !Rc::ptr_eq(node, start)));

    Ok((dest, stopped))
}
