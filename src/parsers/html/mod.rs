//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作
//! - `units`: 尺寸单位换算
//! - `element_handlers`: 按标签种类转换源节点
//! - `walker`: 跨越兄弟和祖先边界的遍历
//! - `reflow`: 段落重排与图片处理
//! - `metadata`: 标题和编码声明
//! - `serializer`: 序列化与输出编码

pub mod dom;
pub mod element_handlers;
pub mod metadata;
pub mod reflow;
pub mod serializer;
pub mod units;
pub mod walker;

pub use dom::{
    append_child, create_document, create_element, create_text, detach, find_nodes,
    first_text_descendant, get_node_attr, get_node_name, get_parent_node, get_text,
    html_str_to_dom, is_element, is_text, node_string, relabel, serialize_node, set_node_attr,
    set_text_content, text_content, text_nodes,
};
pub use element_handlers::{ConvertOptions, ElementKind, FLASH_MIME_TYPE};
pub use metadata::{get_charset, get_title};
pub use reflow::{Reflow, ReflowState};
pub use serializer::{encode, serialize_document};
pub use units::get_obj_size;
pub use walker::{walk, Converted, StopPredicate};
