//! HTTP 会话与下载
//!
//! 下载统一走 `Fetcher::fetch`：成功写入目标文件返回 `true`，
//! 重试耗尽返回 `false`，由调用方决定是否请求确认。

use std::fs;
use std::path::Path;

use regex::bytes::Regex as BytesRegex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, REFERER, USER_AGENT};

use crate::config::{NetworkConfig, SourceRewrite, UrlSwitch};
use crate::error::{TuguaError, TuguaResult};
use crate::utils::url::{parse_data_url, switch_url};

/// 对响应字节的改写
#[derive(Debug, Clone)]
pub enum ResponseTransform {
    /// 字面替换
    Replace { from: Vec<u8>, to: Vec<u8> },
    /// 正则替换，替换串支持 `$1` 形式的分组引用
    Regex { pattern: BytesRegex, replacement: Vec<u8> },
}

impl ResponseTransform {
    pub fn from_rewrite(rewrite: &SourceRewrite) -> TuguaResult<Self> {
        if rewrite.regex {
            let pattern = BytesRegex::new(&rewrite.pattern).map_err(|e| {
                TuguaError::Config(format!("无效的源文件改写规则 {}: {}", rewrite.pattern, e))
            })?;
            Ok(ResponseTransform::Regex {
                pattern,
                replacement: rewrite.replacement.as_bytes().to_vec(),
            })
        } else {
            Ok(ResponseTransform::Replace {
                from: rewrite.pattern.as_bytes().to_vec(),
                to: rewrite.replacement.as_bytes().to_vec(),
            })
        }
    }

    pub fn apply(&self, data: &[u8]) -> Vec<u8> {
        match self {
            ResponseTransform::Replace { from, to } => replace_bytes(data, from, to),
            ResponseTransform::Regex {
                pattern,
                replacement,
            } => pattern.replace_all(data, replacement.as_slice()).into_owned(),
        }
    }
}

fn replace_bytes(data: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    if from.is_empty() {
        return data.to_vec();
    }

    let mut result = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i..].starts_with(from) {
            result.extend_from_slice(to);
            i += from.len();
        } else {
            result.push(data[i]);
            i += 1;
        }
    }
    result
}

/// 单次下载的选项
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// 覆盖已存在的文件，`None` 时使用会话配置
    pub override_file: Option<bool>,
    /// 额外请求头，覆盖会话默认值
    pub headers: Vec<(String, String)>,
    /// 写入前依次作用于响应体
    pub transforms: Vec<ResponseTransform>,
}

/// 下载器
pub trait Fetcher {
    fn fetch(&self, url: &str, path: &Path, options: &FetchOptions) -> bool;
}

/// 基于 reqwest 阻塞客户端的下载会话
pub struct Session {
    client: Client,
    max_retry: usize,
    override_file: bool,
    url_switch: Vec<UrlSwitch>,
}

impl Session {
    pub fn new(config: &NetworkConfig) -> TuguaResult<Session> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("tugua")),
        );
        if !config.referer.is_empty() {
            if let Ok(referer) = HeaderValue::from_str(&config.referer) {
                headers.insert(REFERER, referer);
            }
        }
        for (name, value) in &config.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout());

        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| TuguaError::Config(format!("无效的代理地址 {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        Ok(Session {
            client: builder.build()?,
            max_retry: config.max_retry.max(1),
            override_file: config.override_file,
            url_switch: config.url_switch.clone(),
        })
    }

    fn retrieve(&self, url: &str, options: &FetchOptions) -> TuguaResult<Vec<u8>> {
        if let Some((_media_type, data)) = parse_data_url(url) {
            return Ok(data);
        }

        let mut request = self.client.get(url);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send()?;
        if !response.status().is_success() {
            return Err(TuguaError::Network(format!(
                "{} 返回状态 {}",
                url,
                response.status()
            )));
        }

        Ok(response.bytes()?.to_vec())
    }
}

impl Fetcher for Session {
    fn fetch(&self, url: &str, path: &Path, options: &FetchOptions) -> bool {
        let url = switch_url(url.trim(), &self.url_switch);
        let override_file = options.override_file.unwrap_or(self.override_file);

        if !override_file && has_content(path) {
            tracing::info!("文件 {} 已存在，跳过下载", path.display());
            return true;
        }

        tracing::info!("下载 {} 到 {} ...", url, path.display());
        for attempt in 1..=self.max_retry {
            match self.retrieve(&url, options) {
                Ok(data) if !data.is_empty() => {
                    let data = options
                        .transforms
                        .iter()
                        .fold(data, |data, transform| transform.apply(&data));
                    match fs::write(path, &data) {
                        Ok(()) => return true,
                        Err(err) => {
                            tracing::error!("写入文件 {} 失败: {}", path.display(), err);
                            return false;
                        }
                    }
                }
                Ok(_) => tracing::debug!("第 {} 次下载 {} 得到空内容", attempt, url),
                Err(err) => tracing::debug!("第 {} 次下载 {} 失败: {}", attempt, url, err),
            }
        }

        tracing::error!("下载 {} 到 {} 失败", url, path.display());
        false
    }
}

/// 文件存在且非空
pub fn has_content(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}
