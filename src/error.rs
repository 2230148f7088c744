//! 转换流程统一错误处理
//!
//! 结构错误、内容错误和操作员中止都会终止当前日期的转换，
//! 由批处理层记录后继续处理下一个日期。

use thiserror::Error;

/// 图卦转换错误类型
#[derive(Error, Debug)]
pub enum TuguaError {
    /// 源标签结构不符合预期（带内容的 br、缺少 type 的 object 等）
    #[error("标签结构错误: {0}")]
    Structure(String),

    /// 文档内容不符合预期（无标题、日期不符、找不到锚点等）
    #[error("内容错误: {0}")]
    Content(String),

    /// 操作员在确认提示处拒绝继续
    #[error("操作已中止: {0}")]
    Aborted(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    Network(String),

    /// 文件读写错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),
}

impl TuguaError {
    /// 是否由操作员主动中止
    pub fn is_aborted(&self) -> bool {
        matches!(self, TuguaError::Aborted(_))
    }
}

impl From<serde_json::Error> for TuguaError {
    fn from(err: serde_json::Error) -> Self {
        TuguaError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for TuguaError {
    fn from(err: reqwest::Error) -> Self {
        TuguaError::Network(err.to_string())
    }
}

/// 转换结果类型
pub type TuguaResult<T> = Result<T, TuguaError>;
