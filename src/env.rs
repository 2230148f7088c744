//! 环境变量管理
//!
//! 提供类型安全、可验证的环境变量访问，用于覆盖配置文件中的取值

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 运行相关环境变量
pub mod core {
    use super::*;

    /// 配置文件路径
    pub struct ConfigPath;
    impl EnvVar<String> for ConfigPath {
        const NAME: &'static str = "TUGUA_CONFIG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Path of the tugua.toml configuration file";

        fn parse(value: &str) -> EnvResult<String> {
            let path = value.trim();
            if path.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Path must not be empty".to_string(),
                });
            }
            Ok(shellexpand::tilde(path).into_owned())
        }
    }

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "TUGUA_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 是否在确认点等待终端输入
    pub struct Interactive;
    impl EnvVar<bool> for Interactive {
        const NAME: &'static str = "TUGUA_INTERACTIVE";
        const DEFAULT: Option<bool> = None;
        const DESCRIPTION: &'static str = "Ask on the terminal before continuing after anomalies";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 输出根目录
    pub struct Dir;
    impl EnvVar<String> for Dir {
        const NAME: &'static str = "TUGUA_DIR";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Directory where converted digests are stored";

        fn parse(value: &str) -> EnvResult<String> {
            Ok(shellexpand::tilde(value.trim()).into_owned())
        }
    }

    /// 是否下载图片
    pub struct DownloadImg;
    impl EnvVar<bool> for DownloadImg {
        const NAME: &'static str = "TUGUA_DOWNLOAD_IMG";
        const DEFAULT: Option<bool> = None;
        const DESCRIPTION: &'static str = "Download and classify images while converting";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }
}

/// 网络相关环境变量
pub mod network {
    use super::*;

    /// 下载代理
    pub struct Proxy;
    impl EnvVar<String> for Proxy {
        const NAME: &'static str = "TUGUA_PROXY";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Proxy used for every download";

        fn parse(value: &str) -> EnvResult<String> {
            let proxy = value.trim();
            if proxy.contains("://") {
                Ok(proxy.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Proxy must include a scheme, e.g. http://127.0.0.1:8080".to_string(),
                })
            }
        }
    }

    /// 单次下载超时
    pub struct Timeout;
    impl EnvVar<Duration> for Timeout {
        const NAME: &'static str = "TUGUA_TIMEOUT";
        const DEFAULT: Option<Duration> = None;
        const DESCRIPTION: &'static str = "Per-attempt download timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds = parse_positive_usize(value, Self::NAME, 1, 600)?;
            Ok(Duration::from_secs(seconds as u64))
        }
    }

    /// 最大重试次数
    pub struct MaxRetry;
    impl EnvVar<usize> for MaxRetry {
        const NAME: &'static str = "TUGUA_MAX_RETRY";
        const DEFAULT: Option<usize> = None;
        const DESCRIPTION: &'static str = "Download attempts before giving up";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 20)
        }
    }
}

fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Ok(true),
        "false" | "0" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!(
                "Invalid boolean value '{}'. Use: true/false, 1/0, yes/no, on/off, enabled/disabled",
                value
            ),
        }),
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

/// 列出所有受支持的环境变量及说明
pub fn describe_all() -> Vec<(&'static str, &'static str)> {
    vec![
        (core::ConfigPath::NAME, core::ConfigPath::DESCRIPTION),
        (core::LogLevel::NAME, core::LogLevel::DESCRIPTION),
        (core::Interactive::NAME, core::Interactive::DESCRIPTION),
        (core::Dir::NAME, core::Dir::DESCRIPTION),
        (core::DownloadImg::NAME, core::DownloadImg::DESCRIPTION),
        (network::Proxy::NAME, network::Proxy::DESCRIPTION),
        (network::Timeout::NAME, network::Timeout::DESCRIPTION),
        (network::MaxRetry::NAME, network::MaxRetry::DESCRIPTION),
    ]
}
