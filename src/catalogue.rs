//! 目录批量转换
//!
//! 下载图卦目录页，找出所有带日期标题的链接，逐篇转换尚未转换的日期。
//! 单篇失败只记录错误，继续处理下一篇；操作员拒绝继续时整批停止。

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::Local;

use crate::core::{convert_document, download_tugua, ConversionContext, EncodingProcessor};
use crate::error::TuguaResult;
use crate::network::{has_content, FetchOptions};
use crate::parsers::html::{find_nodes, get_node_attr, get_text};
use crate::utils::url::{resolve_url, Url};

/// 目录页中的一篇图卦
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueEntry {
    pub date: String,
    pub title: String,
    pub url: String,
}

/// 一次批量转换的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub converted: usize,
    pub failed: usize,
}

impl BatchSummary {
    /// 汇总文件中的一行
    pub fn line(&self) -> String {
        format!(
            "{} converted={} failed={}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            self.converted,
            self.failed
        )
    }

    /// 追加到汇总文件
    pub fn append_to(&self, path: &Path) -> TuguaResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", self.line())?;
        Ok(())
    }
}

/// 从目录页中提取图卦链接
pub fn parse_catalogue(
    ctx: &ConversionContext,
    data: &[u8],
    url: &str,
) -> TuguaResult<Vec<CatalogueEntry>> {
    let dom = EncodingProcessor::new(&ctx.config.tugua.src_encoding).parse(data)?;
    let base = Url::parse(url.trim()).ok();
    let mut entries = Vec::new();

    for link in find_nodes(&dom.document, &["a"]) {
        let Some(href) = get_node_attr(&link, "href").filter(|href| !href.trim().is_empty()) else {
            continue;
        };
        let text = get_text(&link);
        let Some(captures) = ctx
            .patterns
            .catalog_title
            .captures(&text)
            .filter(|captures| captures.get(0).map_or(false, |m| m.start() == 0))
        else {
            continue;
        };

        entries.push(CatalogueEntry {
            date: captures.get(1).map_or("", |m| m.as_str()).to_string(),
            title: captures.get(0).map_or("", |m| m.as_str()).trim().to_string(),
            url: resolve_url(base.as_ref(), &href),
        });
    }

    Ok(entries)
}

/// 按目录页批量转换
///
/// `choice` 指定日期且该日期的源文件已存在时直接转换，不再下载目录页。
pub fn catalogue(
    ctx: &mut ConversionContext,
    url: &str,
    dir: &Path,
    choice: Option<&str>,
) -> TuguaResult<BatchSummary> {
    fs::create_dir_all(dir)?;
    let mut summary = BatchSummary::default();

    if let Some(date) = choice {
        let src_path = dir
            .join(&ctx.config.tugua.src_dir)
            .join(format!("{}.html", date));
        if has_content(&src_path) {
            tracing::info!("使用已有源文件 {}", src_path.display());
            let data = fs::read(&src_path)?;
            record(&mut summary, date, convert_document(ctx, &data, date, "", dir))?;
            return Ok(summary);
        }
    }

    let catalog_path = dir.join(&ctx.config.tugua.catalog_file);
    if catalog_path.is_file() {
        fs::remove_file(&catalog_path)?;
    }
    let options = FetchOptions {
        override_file: Some(true),
        ..Default::default()
    };
    if !ctx.fetcher.fetch(url, &catalog_path, &options) {
        tracing::error!("目录页 {} 下载失败", url);
        ctx.prompter.gate("目录页下载失败")?;
    }

    let data = fs::read(&catalog_path)?;
    let entries = parse_catalogue(ctx, &data, url)?;
    tracing::info!("目录页中共有 {} 篇图卦", entries.len());

    let min_date = ctx.config.tugua.min_date.clone();
    for entry in entries {
        if choice.map_or(false, |date| date != entry.date) {
            continue;
        }
        if min_date.as_deref().map_or(false, |min| min > entry.date.as_str()) {
            continue;
        }
        if dir
            .join(&entry.date)
            .join(&ctx.config.tugua.dest_file)
            .is_file()
        {
            tracing::debug!("图卦 {} 已转换，跳过", entry.date);
            continue;
        }

        tracing::info!("开始下载图卦: {} ({})", entry.title, entry.url);
        let result = download_tugua(ctx, &entry.url, dir, &entry.date);
        record(&mut summary, &entry.date, result)?;
    }

    Ok(summary)
}

/// 记录单篇结果，中止错误原样返回
fn record<T>(summary: &mut BatchSummary, date: &str, result: TuguaResult<T>) -> TuguaResult<()> {
    match result {
        Ok(_) => summary.converted += 1,
        Err(err) if err.is_aborted() => {
            tracing::error!("图卦 {} 转换被中止，停止批量转换", date);
            return Err(err);
        }
        Err(err) => {
            summary.failed += 1;
            tracing::error!("!!! 图卦 {} 转换失败 !!! {}", date, err);
        }
    }
    Ok(())
}
