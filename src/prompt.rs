//! 操作员确认
//!
//! 下载失败、图片无法识别等异常发生后，转换流程会在这里暂停等待确认。
//! 无人值守时自动继续并记录警告。

use std::io::{self, BufRead, Write};

use crate::error::{TuguaError, TuguaResult};

/// 确认策略
pub trait Prompter {
    /// 返回 `true` 表示继续
    fn confirm(&self, message: &str) -> bool;

    /// 拒绝时转换为中止错误
    fn gate(&self, message: &str) -> TuguaResult<()> {
        if self.confirm(message) {
            Ok(())
        } else {
            Err(TuguaError::Aborted(message.to_string()))
        }
    }
}

/// 无人值守模式：总是继续
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl Prompter for AutoConfirm {
    fn confirm(&self, message: &str) -> bool {
        tracing::warn!("{}，自动继续", message);
        true
    }
}

/// 终端交互模式：输入 n/no 中止，其余继续
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl Prompter for TerminalPrompt {
    fn confirm(&self, message: &str) -> bool {
        let mut stderr = io::stderr();
        let _ = write!(stderr, "{}，是否继续? [Y/n] ", message);
        let _ = stderr.flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }

        is_affirmative(&answer)
    }
}

fn is_affirmative(answer: &str) -> bool {
    !matches!(answer.trim().to_lowercase().as_str(), "n" | "no")
}

/// 根据终端状态选择确认策略
pub fn default_prompter(interactive: Option<bool>) -> Box<dyn Prompter> {
    let interactive = interactive.unwrap_or_else(|| atty::is(atty::Stream::Stdin));

    if interactive {
        Box::new(TerminalPrompt)
    } else {
        Box::new(AutoConfirm)
    }
}
