use encoding_rs::Encoding;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use markup5ever_rcdom::{Handle, SerializableHandle};

use crate::error::{TuguaError, TuguaResult};

/// 序列化文档并按目标编码输出
pub fn serialize_document(document: &Handle, document_encoding: &str) -> TuguaResult<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();

    let serializable: SerializableHandle = document.clone().into();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::ChildrenOnly(None),
        ..Default::default()
    };
    serialize(&mut buf, &serializable, opts)
        .map_err(|e| TuguaError::Serialization(format!("无法序列化文档: {}", e)))?;

    if buf.last() != Some(&b'\n') {
        buf.push(b'\n');
    }

    encode(&String::from_utf8_lossy(&buf), document_encoding)
}

/// 按编码名转换文本，无法表示的字符输出为数字字符引用
pub fn encode(text: &str, document_encoding: &str) -> TuguaResult<Vec<u8>> {
    let encoding = Encoding::for_label_no_replacement(document_encoding.as_bytes())
        .ok_or_else(|| TuguaError::Config(format!("未知的编码 \"{}\"", document_encoding)))?;

    let (data, _, had_errors) = encoding.encode(text);
    if had_errors {
        tracing::warn!("部分字符无法以 {} 编码，已转为字符引用", encoding.name());
    }

    Ok(data.into_owned())
}
