use std::cell::RefCell;
use std::rc::Rc;

use html5ever::interface::{Attribute, QualName};
use html5ever::parse_document;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::{format_tendril, StrTendril, TendrilSink};
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};

use crate::error::{TuguaError, TuguaResult};

/// 将已解码的 HTML 文本转换为 DOM
pub fn html_str_to_dom(html: &str) -> TuguaResult<RcDom> {
    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(TuguaError::from)
}

/// 查找指定路径的DOM节点
pub fn find_nodes(node: &Handle, node_names: &[&str]) -> Vec<Handle> {
    let mut found_nodes = Vec::new();
    let Some((node_name, rest)) = node_names.split_first() else {
        return found_nodes;
    };

    let matches = get_node_name(node) == Some(*node_name);

    if matches && rest.is_empty() {
        found_nodes.push(node.clone());
    }

    if matches && !rest.is_empty() {
        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, rest));
        }
    } else {
        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names));
        }
    }

    found_nodes
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

pub fn is_element(node: &Handle, node_name: &str) -> bool {
    get_node_name(node) == Some(node_name)
}

pub fn is_text(node: &Handle) -> bool {
    matches!(node.data, NodeData::Text { .. })
}

/// 获取父节点
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 获取下一个兄弟节点
pub fn next_sibling(node: &Handle) -> Option<Handle> {
    let parent = get_parent_node(node)?;
    let children = parent.children.borrow();
    let index = children.iter().position(|child| Rc::ptr_eq(child, node))?;
    children.get(index + 1).cloned()
}

/// 节点是否为祖先节点本身或其后代
pub fn is_descendant_or_self(node: &Handle, ancestor: &Handle) -> bool {
    let mut current = Some(node.clone());
    while let Some(candidate) = current {
        if Rc::ptr_eq(&candidate, ancestor) {
            return true;
        }
        current = get_parent_node(&candidate);
    }
    false
}

/// 设置节点属性
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let attrs_mut = &mut attrs.borrow_mut();
        let position = attrs_mut
            .iter()
            .position(|attr| &*attr.name.local == attr_name);

        match (position, attr_value) {
            (Some(i), Some(value)) => {
                attrs_mut[i].value.clear();
                attrs_mut[i].value.push_slice(value.as_str());
            }
            (Some(i), None) => {
                attrs_mut.remove(i);
            }
            (None, Some(value)) => {
                attrs_mut.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                    value: format_tendril!("{}", value),
                });
            }
            (None, None) => {}
        }
    }
}

/// 创建新的 HTML 元素
pub fn create_element(name: &str, attrs: &[(&str, &str)]) -> Handle {
    let attrs = attrs
        .iter()
        .map(|(key, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*key)),
            value: format_tendril!("{}", value),
        })
        .collect();

    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(name)),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// 创建文本节点
pub fn create_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    })
}

/// 从原父节点上摘下节点
pub fn detach(node: &Handle) {
    if let Some(parent) = get_parent_node(node) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
    node.parent.set(None);
}

/// 追加子节点，节点会先从原位置移除
pub fn append_child(parent: &Handle, child: &Handle) {
    detach(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child.clone());
}

/// 在最前面插入子节点
pub fn prepend_child(parent: &Handle, child: &Handle) {
    detach(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().insert(0, child.clone());
}

/// 取出全部子节点
pub fn take_children(parent: &Handle) -> Vec<Handle> {
    let children: Vec<Handle> = parent.children.borrow_mut().drain(..).collect();
    for child in &children {
        child.parent.set(None);
    }
    children
}

/// 以新标签名重建元素，子节点整体移入
pub fn relabel(node: &Handle, name: &str) -> Handle {
    let attrs: Vec<(String, String)> = match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect(),
        _ => Vec::new(),
    };
    let borrowed: Vec<(&str, &str)> = attrs
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let result = create_element(name, &borrowed);
    for child in take_children(node) {
        append_child(&result, &child);
    }
    result
}

/// 文本节点内容
pub fn text_content(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

pub fn set_text_content(node: &Handle, text: &str) {
    if let NodeData::Text { contents } = &node.data {
        *contents.borrow_mut() = StrTendril::from_slice(text);
    }
}

/// 节点的唯一文本：文本节点返回自身内容，只有一个子节点的元素递归向下取
pub fn node_string(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        NodeData::Element { .. } => {
            let children = node.children.borrow();
            if children.len() == 1 {
                node_string(&children[0])
            } else {
                None
            }
        }
        _ => None,
    }
}

/// 拼接全部后代文本
pub fn get_text(node: &Handle) -> String {
    let mut result = String::new();
    collect_text(node, &mut result);
    result
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
    }
}

/// 文档顺序的全部文本节点
pub fn text_nodes(node: &Handle) -> Vec<Handle> {
    let mut found = Vec::new();
    collect_text_nodes(node, &mut found);
    found
}

fn collect_text_nodes(node: &Handle, out: &mut Vec<Handle>) {
    if is_text(node) {
        out.push(node.clone());
        return;
    }
    for child in node.children.borrow().iter() {
        collect_text_nodes(child, out);
    }
}

/// 第一个文本后代
pub fn first_text_descendant(node: &Handle) -> Option<Handle> {
    if is_text(node) {
        return Some(node.clone());
    }
    let children: Vec<Handle> = node.children.borrow().clone();
    children.iter().find_map(first_text_descendant)
}

/// 序列化节点，用于日志和输出
pub fn serialize_node(node: &Handle, include_node: bool) -> String {
    let mut buf: Vec<u8> = Vec::new();
    let scope = if include_node {
        TraversalScope::IncludeNode
    } else {
        TraversalScope::ChildrenOnly(None)
    };
    let serializable: SerializableHandle = node.clone().into();
    let opts = SerializeOpts {
        traversal_scope: scope,
        ..Default::default()
    };

    match &node.data {
        NodeData::Text { contents } if include_node => return contents.borrow().to_string(),
        NodeData::Document if include_node => {
            let _ = serialize(&mut buf, &serializable, SerializeOpts::default());
        }
        _ => {
            let _ = serialize(&mut buf, &serializable, opts);
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

/// 创建一个空的文档节点
pub fn create_document() -> Handle {
    Node::new(NodeData::Document)
}
