//! 配置管理
//!
//! 支持 TOML/JSON 配置文件、`.env` 文件和环境变量覆盖，所有字段都有默认值

use std::path::{Path, PathBuf};
use std::time::Duration;

use encoding_rs::Encoding;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{TuguaError, TuguaResult};

/// 默认配置文件查找路径
pub const CONFIG_PATHS: &[&str] = &["./tugua.toml", "~/.config/tugua/tugua.toml"];

pub const DEFAULT_TITLE_PATTERN: &str = r"【喷嚏图卦(\d{8})】\S.*$";
pub const DEFAULT_CATALOG_TITLE_PATTERN: &str = r"^【喷嚏图卦(\d{8})】\S.*$";
pub const DEFAULT_START_PATTERN: &str = r"以下内容，有可能引起内心冲突或愤怒等不适症状。|本文转摘的各类事件，均来自于公开发表的国内媒体报道。引用的个人或媒体评论旨在传播各种声音，并不代表我们认同或反对其观点。";
pub const DEFAULT_END_PATTERN: &str = r"广告联系：dapenti#dapenti.com";
pub const DEFAULT_END_FOLLOW_PATTERN: &str = r"^喷嚏网";
pub const DEFAULT_SUBTITLE_PATTERN: &str = r"^【(\d{0,2})】(.*)";
pub const DEFAULT_EPILOGUE_PATTERN: &str = r"^(友情提示：请各位河蟹评论。道理你懂的)|(\s*喷嚏新浪围脖：\s*@\s*喷嚏官微\s*、\s*@\s*喷嚏意图\s*（新浪）\s*)$";

/// 完整配置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub tugua: TuguaConfig,
    pub correction: CorrectionConfig,
    pub style: StyleConfig,
    pub ident: IdentConfig,
    pub log: LogConfig,
}

/// URL 替换规则，下载前对绝对地址做字面替换
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UrlSwitch {
    pub from: String,
    pub to: String,
}

/// 网络配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub user_agent: String,
    pub referer: String,
    pub proxy: Option<String>,
    pub max_retry: usize,
    pub timeout_secs: u64,
    pub override_file: bool,
    pub url_switch: Vec<UrlSwitch>,
    pub headers: Vec<(String, String)>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".to_string(),
            referer: "https://www.dapenti.com/".to_string(),
            proxy: None,
            max_retry: 3,
            timeout_secs: 30,
            override_file: false,
            url_switch: Vec::new(),
            headers: Vec::new(),
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 源文件改写规则，在保存源页面快照前作用于原始字节
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceRewrite {
    pub pattern: String,
    pub replacement: String,
    #[serde(default)]
    pub regex: bool,
}

/// 图卦转换配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TuguaConfig {
    pub tugua_dir: String,
    pub src_dir: String,
    pub dest_file: String,
    pub catalog_file: String,
    pub tmp_file: String,
    pub catalog_url: String,
    pub src_encoding: Vec<String>,
    pub dest_encoding: String,
    pub min_date: Option<String>,
    pub download_img: bool,
    pub lazy_image_attrs: Vec<String>,
    pub video_domains: Vec<String>,
    pub title_pattern: String,
    pub catalog_title_pattern: String,
    pub start_pattern: String,
    pub end_pattern: String,
    pub end_follow_pattern: String,
    pub subtitle_pattern: String,
    pub epilogue_pattern: String,
    pub source_rewrites: Vec<SourceRewrite>,
}

impl Default for TuguaConfig {
    fn default() -> Self {
        Self {
            tugua_dir: ".".to_string(),
            src_dir: "src".to_string(),
            dest_file: "index.html".to_string(),
            catalog_file: "catalog.html".to_string(),
            tmp_file: "img_info.json".to_string(),
            catalog_url: "https://www.dapenti.com/blog/blog.asp?subjectid=70&name=xilei"
                .to_string(),
            src_encoding: vec!["utf-8".to_string(), "gb18030".to_string()],
            dest_encoding: "utf-8".to_string(),
            min_date: None,
            download_img: true,
            lazy_image_attrs: vec!["data-src".to_string(), "data-original".to_string()],
            video_domains: vec![
                "youku.com".to_string(),
                "tudou.com".to_string(),
                "56.com".to_string(),
                "video.qq.com".to_string(),
            ],
            title_pattern: DEFAULT_TITLE_PATTERN.to_string(),
            catalog_title_pattern: DEFAULT_CATALOG_TITLE_PATTERN.to_string(),
            start_pattern: DEFAULT_START_PATTERN.to_string(),
            end_pattern: DEFAULT_END_PATTERN.to_string(),
            end_follow_pattern: DEFAULT_END_FOLLOW_PATTERN.to_string(),
            subtitle_pattern: DEFAULT_SUBTITLE_PATTERN.to_string(),
            epilogue_pattern: DEFAULT_EPILOGUE_PATTERN.to_string(),
            source_rewrites: Vec::new(),
        }
    }
}

/// 纠错配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorrectionConfig {
    pub face_img_width_max: u32,
    pub face_img_height_max: u32,
    pub default_img_ext: String,
    pub title_num_error_max: usize,
    pub prompt_on_unsure: bool,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            face_img_width_max: 50,
            face_img_height_max: 50,
            default_img_ext: "jpg".to_string(),
            title_num_error_max: 2,
            prompt_on_unsure: false,
        }
    }
}

/// 输出页面引用的样式和脚本
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StyleConfig {
    pub jquery_file: Option<String>,
    pub css_file: Option<String>,
    pub js_file: Option<String>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            jquery_file: Some("../jquery.min.js".to_string()),
            css_file: Some("../tugua.css".to_string()),
            js_file: Some("../tugua.js".to_string()),
        }
    }
}

/// 输出区块的 id 与 class 名称
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentConfig {
    pub title: String,
    pub prologue: String,
    pub section: String,
    pub subtitle: String,
    pub face: String,
    pub extra: String,
    pub ad: String,
    pub epilogue: String,
}

impl Default for IdentConfig {
    fn default() -> Self {
        Self {
            title: "title".to_string(),
            prologue: "prologue".to_string(),
            section: "section".to_string(),
            subtitle: "subtitle".to_string(),
            face: "face".to_string(),
            extra: "extra".to_string(),
            ad: "ad".to_string(),
            epilogue: "epilogue".to_string(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    pub file: Option<String>,
    pub level: String,
    pub summary_file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: "info".to_string(),
            summary_file: None,
        }
    }
}

/// 编译后的匹配规则
#[derive(Debug, Clone)]
pub struct Patterns {
    pub title: Regex,
    pub catalog_title: Regex,
    pub start: Regex,
    pub end: Regex,
    pub end_follow: Regex,
    pub subtitle: Regex,
    pub epilogue: Regex,
}

impl Patterns {
    pub fn compile(tugua: &TuguaConfig) -> TuguaResult<Self> {
        Ok(Self {
            title: compile_pattern("title_pattern", &tugua.title_pattern)?,
            catalog_title: compile_pattern("catalog_title_pattern", &tugua.catalog_title_pattern)?,
            start: compile_pattern("start_pattern", &tugua.start_pattern)?,
            end: compile_pattern("end_pattern", &tugua.end_pattern)?,
            end_follow: compile_pattern("end_follow_pattern", &tugua.end_follow_pattern)?,
            subtitle: compile_pattern("subtitle_pattern", &tugua.subtitle_pattern)?,
            epilogue: compile_pattern("epilogue_pattern", &tugua.epilogue_pattern)?,
        })
    }
}

fn compile_pattern(key: &str, pattern: &str) -> TuguaResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| TuguaError::Config(format!("无效的正则表达式 {}: {}", key, e)))
}

/// 匹配必须从文本开头开始
pub fn matches_at_start(re: &Regex, text: &str) -> bool {
    re.find(text).map_or(false, |m| m.start() == 0)
}

impl Config {
    /// 按优先级加载配置：显式路径、`TUGUA_CONFIG`、默认查找路径、内置默认值
    pub fn load(path: Option<&Path>) -> TuguaResult<Self> {
        use crate::env::{core, EnvVar};

        Self::load_dotenv();

        let explicit: Option<PathBuf> = path
            .map(|p| p.to_path_buf())
            .or_else(|| core::ConfigPath::get().ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::load_from_file(&path)?,
            None => {
                let mut found = None;
                for candidate in CONFIG_PATHS {
                    let expanded = shellexpand::tilde(candidate);
                    let candidate = Path::new(expanded.as_ref());
                    if candidate.exists() {
                        found = Some(Self::load_from_file(candidate)?);
                        break;
                    }
                }
                found.unwrap_or_else(|| {
                    tracing::info!("未找到配置文件，使用默认配置");
                    Config::default()
                })
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 从指定文件加载配置
    pub fn load_from_file(path: &Path) -> TuguaResult<Self> {
        tracing::info!("加载配置文件: {}", path.display());
        let content = std::fs::read_to_string(path)
            .map_err(|e| TuguaError::Config(format!("读取配置文件失败: {}", e)))?;

        if path.extension().map_or(false, |ext| ext == "json") {
            serde_json::from_str(&content)
                .map_err(|e| TuguaError::Config(format!("解析JSON配置失败: {}", e)))
        } else {
            Self::from_toml_str(&content)
        }
    }

    pub fn from_toml_str(content: &str) -> TuguaResult<Self> {
        toml::from_str(content).map_err(|e| TuguaError::Config(format!("解析TOML配置失败: {}", e)))
    }

    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{core, network, EnvVar};

        if let Ok(level) = core::LogLevel::get() {
            self.log.level = level;
        }

        if let Ok(dir) = core::Dir::get() {
            self.tugua.tugua_dir = dir;
        }

        if let Ok(download) = core::DownloadImg::get() {
            self.tugua.download_img = download;
        }

        if let Ok(proxy) = network::Proxy::get() {
            tracing::info!("环境变量覆盖下载代理: {}", proxy);
            self.network.proxy = Some(proxy);
        }

        if let Ok(timeout) = network::Timeout::get() {
            self.network.timeout_secs = timeout.as_secs();
        }

        if let Ok(retry) = network::MaxRetry::get() {
            self.network.max_retry = retry;
        }
    }

    /// 验证配置
    pub fn validate(&self) -> TuguaResult<()> {
        if self.network.max_retry == 0 {
            return Err(TuguaError::Config("下载重试次数不能为0".to_string()));
        }

        if self.network.timeout_secs == 0 {
            return Err(TuguaError::Config("下载超时不能为0".to_string()));
        }

        if self.tugua.dest_file.trim().is_empty() {
            return Err(TuguaError::Config("输出文件名不能为空".to_string()));
        }

        for label in self
            .tugua
            .src_encoding
            .iter()
            .chain(std::iter::once(&self.tugua.dest_encoding))
        {
            if Encoding::for_label(label.as_bytes()).is_none() {
                return Err(TuguaError::Config(format!("未知的字符编码: {}", label)));
            }
        }

        if let Some(min_date) = &self.tugua.min_date {
            if min_date.len() != 8 || !min_date.chars().all(|c| c.is_ascii_digit()) {
                return Err(TuguaError::Config(format!(
                    "最早日期必须是 YYYYMMDD 格式: {}",
                    min_date
                )));
            }
        }

        for rewrite in &self.tugua.source_rewrites {
            if rewrite.regex {
                compile_pattern("source_rewrites", &rewrite.pattern)?;
            }
        }

        Patterns::compile(&self.tugua)?;
        Ok(())
    }
}
