//! 图卦转换流程
//!
//! 一篇图卦依次经过以下阶段，任一阶段出错即放弃该日期：
//!
//! | 阶段 | 处理器 | 说明 |
//! |------|--------|------|
//! | 解码 | `EncodingProcessor` | 按配置依次尝试源编码 |
//! | 定位 | `AnchorLocator` | 标题校验，查找正文起止位置 |
//! | 分节 | `Segmenter` | 按小标题切分导语和各小节 |
//! | 校验 | `SubtitleValidator` | 小标题重新编号 |
//! | 排版 | `Reflow` | 段落重排，下载图片 |
//! | 分区 | `ZoneClassifier` | 拆出附加、广告和结束语 |
//! | 输出 | `OutputFormatter` | 组装并编码输出文档 |

use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::OnceLock;

use encoding_rs::Encoding;
use markup5ever_rcdom::{Handle, RcDom};
use regex::Regex;
use url::Url;

use crate::config::{matches_at_start, Config, Patterns};
use crate::error::{TuguaError, TuguaResult};
use crate::media::{FaceLimits, ImageInfo, ImageInfoStore};
use crate::network::{FetchOptions, Fetcher, ResponseTransform, Session};
use crate::parsers::html::{
    append_child, create_document, create_element, create_text, detach, first_text_descendant,
    get_charset, get_node_name, get_parent_node, get_text, get_title, html_str_to_dom, is_element,
    node_string, relabel, serialize_document, serialize_node, set_node_attr, set_text_content,
    text_content, text_nodes, walk, ConvertOptions, Reflow,
};
use crate::prompt::Prompter;

/// 一次运行共享的转换上下文
pub struct ConversionContext {
    pub config: Config,
    pub patterns: Patterns,
    pub fetcher: Box<dyn Fetcher>,
    pub prompter: Box<dyn Prompter>,
    source_transforms: Vec<ResponseTransform>,
    base_url: Option<Url>,
}

impl ConversionContext {
    pub fn new(
        config: Config,
        fetcher: Box<dyn Fetcher>,
        prompter: Box<dyn Prompter>,
    ) -> TuguaResult<Self> {
        let patterns = Patterns::compile(&config.tugua)?;
        let source_transforms = config
            .tugua
            .source_rewrites
            .iter()
            .map(ResponseTransform::from_rewrite)
            .collect::<TuguaResult<Vec<_>>>()?;

        Ok(ConversionContext {
            config,
            patterns,
            fetcher,
            prompter,
            source_transforms,
            base_url: None,
        })
    }

    /// 使用 HTTP 会话作为下载器
    pub fn with_session(config: Config, prompter: Box<dyn Prompter>) -> TuguaResult<Self> {
        let session = Session::new(&config.network)?;
        Self::new(config, Box::new(session), prompter)
    }

    pub fn convert_options(&self) -> ConvertOptions<'_> {
        ConvertOptions {
            base_url: self.base_url.as_ref(),
            lazy_image_attrs: &self.config.tugua.lazy_image_attrs,
            video_domains: &self.config.tugua.video_domains,
            prompt_on_unsure: self.config.correction.prompt_on_unsure,
            prompter: self.prompter.as_ref(),
        }
    }

    pub fn face_limits(&self) -> FaceLimits {
        FaceLimits {
            width: self.config.correction.face_img_width_max,
            height: self.config.correction.face_img_height_max,
        }
    }

    /// 设置当前文档的地址，用于解析相对链接
    pub fn set_base_url(&mut self, url: &str) {
        self.base_url = Url::parse(url.trim()).ok();
    }

    pub fn clear_base_url(&mut self) {
        self.base_url = None;
    }

    pub fn source_transforms(&self) -> &[ResponseTransform] {
        &self.source_transforms
    }
}

/// 转换阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decoding,
    LocatingStart,
    LocatingEnd,
    Segmenting,
    ValidatingSubtitles,
    Formatting,
    ClassifyingZones,
    Serializing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decoding => "解码",
            Stage::LocatingStart => "定位起始位置",
            Stage::LocatingEnd => "定位结束位置",
            Stage::Segmenting => "分节",
            Stage::ValidatingSubtitles => "校验小标题",
            Stage::Formatting => "排版与下载图片",
            Stage::ClassifyingZones => "拆分附加区域",
            Stage::Serializing => "输出",
        };
        f.write_str(name)
    }
}

/// 下载指定日期的图卦并转换
///
/// 源文件保存为 `<dir>/<src_dir>/<date>.html`，已存在且非空时直接复用。
/// `url` 为空时只转换已有的源文件。
pub fn download_tugua(
    ctx: &mut ConversionContext,
    url: &str,
    dir: &Path,
    date: &str,
) -> TuguaResult<PathBuf> {
    let src_dir = dir.join(&ctx.config.tugua.src_dir);
    fs::create_dir_all(&src_dir)?;
    let src_path = src_dir.join(format!("{}.html", date));

    let url = url.trim();
    if !url.is_empty() {
        let options = FetchOptions {
            transforms: ctx.source_transforms.clone(),
            ..Default::default()
        };
        if !ctx.fetcher.fetch(url, &src_path, &options) {
            tracing::error!("图卦源文件 {} 下载失败", url);
            ctx.prompter.gate("源文件下载失败")?;
        }
    }

    let data = fs::read(&src_path)?;
    convert_document(ctx, &data, date, url, dir)
}

/// 转换一篇图卦源文件，返回输出文件路径
pub fn convert_document(
    ctx: &mut ConversionContext,
    data: &[u8],
    date: &str,
    url: &str,
    dir: &Path,
) -> TuguaResult<PathBuf> {
    ctx.set_base_url(url);
    let result = DocumentProcessor::new(ctx, date, url).process_document(data, dir);
    ctx.clear_base_url();
    result
}

/// 文档处理器，负责协调整个转换流程
pub struct DocumentProcessor<'a> {
    ctx: &'a ConversionContext,
    date: &'a str,
    url: &'a str,
}

impl<'a> DocumentProcessor<'a> {
    pub fn new(ctx: &'a ConversionContext, date: &'a str, url: &'a str) -> Self {
        Self { ctx, date, url }
    }

    pub fn process_document(&self, data: &[u8], dir: &Path) -> TuguaResult<PathBuf> {
        let mut stage = Stage::Decoding;
        let result = self.run_stages(data, dir, &mut stage);
        if let Err(err) = &result {
            tracing::debug!("图卦 {} 在「{}」阶段中止: {}", self.date, stage, err);
        }
        result
    }

    fn run_stages(&self, data: &[u8], dir: &Path, stage: &mut Stage) -> TuguaResult<PathBuf> {
        let config = &self.ctx.config;

        // 1. 解码并解析
        let dom = EncodingProcessor::new(&config.tugua.src_encoding).parse(data)?;

        // 2. 标题与正文起止位置
        *stage = Stage::LocatingStart;
        let locator = AnchorLocator::new(&self.ctx.patterns);
        let title = locator.check_title(&dom.document, self.date)?;
        let start = locator.find_start(&dom.document)?;
        *stage = Stage::LocatingEnd;
        let end = locator.find_end(&dom.document)?;

        // 3. 分节
        *stage = Stage::Segmenting;
        let options = self.ctx.convert_options();
        let (prologue, sections) =
            Segmenter::new(&options, &self.ctx.patterns).segment(&start, &end)?;
        tracing::info!("图卦 {} 共 {} 节", self.date, sections.len());

        // 4. 小标题编号
        *stage = Stage::ValidatingSubtitles;
        SubtitleValidator::new(
            &self.ctx.patterns.subtitle,
            config.correction.title_num_error_max,
        )
        .validate(&sections)?;

        // 5. 排版与图片
        *stage = Stage::Formatting;
        let dest_dir = dir.join(self.date);
        fs::create_dir_all(&dest_dir)?;
        let store_path = dir.join(&config.tugua.src_dir).join(&config.tugua.tmp_file);
        let mut store = ImageInfoStore::load(&store_path)?;
        let mut info = store.get(self.date);
        let (prologue, sections) =
            match self.format_sections(&dest_dir, &prologue, &sections, &mut info, &mut store) {
                Ok(formatted) => formatted,
                Err(err) => {
                    store.put(self.date, &info);
                    if let Err(save_err) = store.save() {
                        tracing::error!("保存图片信息失败: {}", save_err);
                    }
                    return Err(err);
                }
            };

        // 6. 附加、广告和结束语
        *stage = Stage::ClassifyingZones;
        let zones = ZoneClassifier::new(&self.ctx.patterns.epilogue).classify(&sections)?;

        // 7. 输出
        *stage = Stage::Serializing;
        let formatter = OutputFormatter::new(config, self.url);
        let document = formatter.assemble(&title, &prologue, &sections, &zones);
        let output = serialize_document(&document, &config.tugua.dest_encoding)?;
        let dest_path = dest_dir.join(&config.tugua.dest_file);
        tracing::info!("保存文件 {} ...", dest_path.display());
        fs::write(&dest_path, output)?;

        store.remove(self.date);
        store.save()?;

        Ok(dest_path)
    }

    fn format_sections(
        &self,
        dest_dir: &Path,
        prologue: &Handle,
        sections: &[Handle],
        info: &mut ImageInfo,
        store: &mut ImageInfoStore,
    ) -> TuguaResult<(Handle, Vec<Handle>)> {
        let prologue = Reflow::new(self.ctx, dest_dir, info, "").run(prologue, false)?;

        let mut formatted = Vec::with_capacity(sections.len());
        for (index, section) in sections.iter().enumerate() {
            let label = format!("{:02}", index + 1);
            info.count = 0;
            formatted.push(Reflow::new(self.ctx, dest_dir, info, &label).run(section, true)?);
            store.put(self.date, info);
            store.save()?;
        }

        Ok((prologue, formatted))
    }
}

/// 编码处理器
pub struct EncodingProcessor<'a> {
    encodings: &'a [String],
}

impl<'a> EncodingProcessor<'a> {
    pub fn new(encodings: &'a [String]) -> Self {
        Self { encodings }
    }

    /// 依次严格尝试配置的编码，都失败时使用文档声明的编码，最后按 UTF-8 容错解码
    pub fn decode(&self, data: &[u8]) -> String {
        for label in self.encodings {
            let Some(encoding) = Encoding::for_label_no_replacement(label.as_bytes()) else {
                tracing::warn!("未知的源编码 '{}'", label);
                continue;
            };
            match encoding.decode_without_bom_handling_and_without_replacement(data) {
                Some(text) => return text.into_owned(),
                None => tracing::warn!("使用 '{}' 解码失败", label),
            }
        }

        let lossy = String::from_utf8_lossy(data);
        let declared = html_str_to_dom(&lossy)
            .ok()
            .and_then(|dom| get_charset(&dom.document))
            .and_then(|charset| Encoding::for_label_no_replacement(charset.as_bytes()));
        match declared {
            Some(encoding) => {
                let (text, _, _) = encoding.decode(data);
                text.into_owned()
            }
            None => lossy.into_owned(),
        }
    }

    pub fn parse(&self, data: &[u8]) -> TuguaResult<RcDom> {
        let text = self.decode(data);
        html_str_to_dom(&normalize_breaks(&text))
    }
}

/// 把 `<br>` 的各种写法统一为 `<br />`
pub fn normalize_breaks(text: &str) -> Cow<'_, str> {
    static BREAK: OnceLock<Regex> = OnceLock::new();
    let re = BREAK.get_or_init(|| {
        Regex::new(r"<\s*[bB][rR]\s*>").unwrap_or_else(|e| unreachable!("{}", e))
    });
    re.replace_all(text, "<br />")
}

/// 标题和正文起止位置定位
pub struct AnchorLocator<'a> {
    patterns: &'a Patterns,
}

impl<'a> AnchorLocator<'a> {
    pub fn new(patterns: &'a Patterns) -> Self {
        Self { patterns }
    }

    /// 校验标题日期，返回规范化后的标题
    pub fn check_title(&self, document: &Handle, date: &str) -> TuguaResult<String> {
        let title = get_title(document)
            .ok_or_else(|| TuguaError::Content("未找到标题".to_string()))?;
        let title = title.trim();
        let captures = self.patterns.title.captures(title).ok_or_else(|| {
            TuguaError::Content(format!("未找到图卦标题，标题为 '{}'", title))
        })?;

        let actual = captures.get(1).map_or("", |m| m.as_str());
        if actual != date {
            return Err(TuguaError::Content(format!(
                "日期不符，输入为 '{}'，实际为 '{}'",
                date, actual
            )));
        }

        Ok(captures
            .get(0)
            .map_or("", |m| m.as_str())
            .trim()
            .to_string())
    }

    /// 起始位置：第一个匹配的文本节点，向上越过只有它一个子节点的非链接元素
    pub fn find_start(&self, document: &Handle) -> TuguaResult<Handle> {
        let text = text_nodes(document)
            .into_iter()
            .find(|node| {
                text_content(node).map_or(false, |text| self.patterns.start.is_match(&text))
            })
            .ok_or_else(|| TuguaError::Content("未找到正文起始位置".to_string()))?;

        let mut start = text;
        while let Some(parent) = get_parent_node(&start) {
            let wrapper = matches!(get_node_name(&parent), Some(name) if !matches!(name, "a" | "body" | "html" | "head"))
                && parent.children.borrow().len() == 1;
            if !wrapper {
                break;
            }
            start = parent;
        }

        Ok(start)
    }

    /// 结束位置：第一个匹配的文本节点，其后若有以“喷嚏网”开头的文本则改用后者，
    /// 再向上找到最近的非链接元素
    pub fn find_end(&self, document: &Handle) -> TuguaResult<Handle> {
        let texts = text_nodes(document);
        let position = texts
            .iter()
            .position(|node| {
                text_content(node).map_or(false, |text| self.patterns.end.is_match(&text))
            })
            .ok_or_else(|| TuguaError::Content("未找到正文结束位置".to_string()))?;

        let follow = texts[position + 1..].iter().find(|node| {
            text_content(node)
                .map_or(false, |text| matches_at_start(&self.patterns.end_follow, &text))
        });
        let mut end = follow.unwrap_or(&texts[position]).clone();

        while !matches!(get_node_name(&end), Some(name) if name != "a") {
            end = get_parent_node(&end)
                .ok_or_else(|| TuguaError::Content("结束位置不在任何元素内".to_string()))?;
        }

        Ok(end)
    }
}

/// 按小标题分节
pub struct Segmenter<'a> {
    options: &'a ConvertOptions<'a>,
    patterns: &'a Patterns,
}

impl<'a> Segmenter<'a> {
    pub fn new(options: &'a ConvertOptions<'a>, patterns: &'a Patterns) -> Self {
        Self { options, patterns }
    }

    /// 返回导语和各小节；结束位置的内容并入最后一节
    pub fn segment(&self, start: &Handle, end: &Handle) -> TuguaResult<(Handle, Vec<Handle>)> {
        let subtitle = &self.patterns.subtitle;
        let stop = |node: &Handle| {
            Rc::ptr_eq(node, end)
                || node_string(node)
                    .map_or(false, |text| matches_at_start(subtitle, text.trim()))
        };

        let (prologue, mut current) = walk(self.options, start, Some(&stop), true)?;
        let mut sections = Vec::new();

        loop {
            let node = current.ok_or_else(|| {
                TuguaError::Content("遍历在到达结束位置前中止".to_string())
            })?;
            if Rc::ptr_eq(&node, end) {
                break;
            }

            let (section, next) = walk(self.options, &node, Some(&stop), true)?;
            sections.push(section);
            current = next;
        }

        let last = sections
            .last()
            .ok_or_else(|| TuguaError::Content("未找到任何小节".to_string()))?;
        let (tail, _) = walk(self.options, end, None, false)?;
        append_child(last, &relabel(&tail, "p"));

        Ok((prologue, sections))
    }
}

/// 小标题校验与重新编号
pub struct SubtitleValidator<'a> {
    subtitle: &'a Regex,
    error_max: usize,
}

impl<'a> SubtitleValidator<'a> {
    pub fn new(subtitle: &'a Regex, error_max: usize) -> Self {
        Self { subtitle, error_max }
    }

    /// 把各节小标题改写为 `【NN】标题`，返回编号错误数
    pub fn validate(&self, sections: &[Handle]) -> TuguaResult<usize> {
        let mut errors = 0;
        let mut drift: i64 = 0;

        for (index, section) in sections.iter().enumerate() {
            let expected = index as i64 + 1;
            let node = first_text_descendant(section).ok_or_else(|| {
                TuguaError::Content(format!(
                    "第 {} 节没有文字: {}",
                    expected,
                    serialize_node(section, true)
                ))
            })?;
            let text = text_content(&node).unwrap_or_default();
            let captures = self
                .subtitle
                .captures(&text)
                .filter(|captures| captures.get(0).map_or(false, |m| m.start() == 0))
                .ok_or_else(|| {
                    TuguaError::Content(format!(
                        "第 {} 节应以小标题 '【{}】' 开始，实际为 '{}'",
                        expected, expected, text
                    ))
                })?;

            let raw_label = captures.get(1).map_or("", |m| m.as_str());
            let label: i64 = raw_label.parse().unwrap_or(0);
            if label != expected && label + drift != expected {
                tracing::warn!("小标题编号不符，应为 {}，实际为 '{}'", expected, raw_label);
                errors += 1;
                drift = expected - label;
            }

            let rest = captures.get(2).map_or("", |m| m.as_str()).trim();
            set_text_content(&node, &format!("【{:02}】{}", expected, rest));
        }

        if errors > self.error_max {
            return Err(TuguaError::Content(format!(
                "小标题编号错误过多，共 {} 处",
                errors
            )));
        }

        Ok(errors)
    }
}

/// 最后一节拆出的区域
#[derive(Debug, Default)]
pub struct Zones {
    pub extra: Vec<Handle>,
    pub ad: Vec<Handle>,
    pub epilogue: Vec<Handle>,
}

/// 附加、广告和结束语的拆分
pub struct ZoneClassifier<'a> {
    epilogue: &'a Regex,
}

impl<'a> ZoneClassifier<'a> {
    pub fn new(epilogue: &'a Regex) -> Self {
        Self { epilogue }
    }

    /// 从最后一节中摘出各区域的段落
    pub fn classify(&self, sections: &[Handle]) -> TuguaResult<Zones> {
        let last = sections
            .last()
            .ok_or_else(|| TuguaError::Content("未找到任何小节".to_string()))?;

        let children: Vec<Handle> = last.children.borrow().clone();
        let mut buffer: Vec<Handle> = Vec::new();
        let mut epilogue_at = None;

        for (index, child) in children.iter().enumerate() {
            let first = child.children.borrow().first().cloned();
            let is_media = first
                .as_ref()
                .map_or(false, |node| is_element(node, "img") || is_element(node, "embed"));

            if is_media {
                buffer.clear();
            } else if matches_at_start(self.epilogue, &get_text(child)) {
                epilogue_at = Some(index);
                break;
            } else {
                buffer.push(child.clone());
            }
        }

        let epilogue_at = epilogue_at.ok_or_else(|| {
            TuguaError::Content(format!("未找到结束语: {}", serialize_node(last, true)))
        })?;

        let mut zones = Zones::default();
        if let Some(last_item) = buffer.pop() {
            if is_bare_link(&last_item) && !buffer.is_empty() {
                zones.ad.extend(buffer.pop());
            }
            zones.ad.push(last_item);
        }
        zones.extra = buffer;
        zones.epilogue = children[epilogue_at..].to_vec();

        for node in zones
            .extra
            .iter()
            .chain(zones.ad.iter())
            .chain(zones.epilogue.iter())
        {
            detach(node);
        }

        Ok(zones)
    }
}

/// 段落只含一个文字以 http 开头的链接
fn is_bare_link(paragraph: &Handle) -> bool {
    let children = paragraph.children.borrow();
    children.len() == 1
        && is_element(&children[0], "a")
        && node_string(&children[0]).map_or(false, |text| text.starts_with("http"))
}

/// 输出文档组装
pub struct OutputFormatter<'a> {
    config: &'a Config,
    url: &'a str,
}

impl<'a> OutputFormatter<'a> {
    pub fn new(config: &'a Config, url: &'a str) -> Self {
        Self { config, url }
    }

    pub fn assemble(
        &self,
        title: &str,
        prologue: &Handle,
        sections: &[Handle],
        zones: &Zones,
    ) -> Handle {
        let ident = &self.config.ident;

        let document = create_document();
        let html = create_element("html", &[]);
        append_child(&document, &html);
        append_child(&html, &self.head(title));

        let body = create_element("body", &[]);
        append_child(&html, &body);

        let title_block = zone_block(&ident.title, &[]);
        let p = create_element("p", &[]);
        let a = create_element("a", &[("href", self.url)]);
        append_child(&a, &create_text(title));
        append_child(&p, &a);
        append_child(&title_block, &p);
        append_child(&body, &title_block);

        set_node_attr(prologue, "id", Some(ident.prologue.clone()));
        set_node_attr(prologue, "class", Some(ident.prologue.clone()));
        append_child(&body, prologue);

        for section in sections {
            append_child(&body, section);
        }

        append_child(&body, &zone_block(&ident.extra, &zones.extra));
        append_child(&body, &zone_block(&ident.ad, &zones.ad));
        append_child(&body, &zone_block(&ident.epilogue, &zones.epilogue));

        document
    }

    fn head(&self, title: &str) -> Handle {
        let style = &self.config.style;
        let head = create_element("head", &[]);

        let content_type = format!("text/html; charset={}", self.config.tugua.dest_encoding);
        append_child(
            &head,
            &create_element(
                "meta",
                &[("http-equiv", "Content-Type"), ("content", content_type.as_str())],
            ),
        );

        if let Some(jquery) = style.jquery_file.as_deref().filter(|s| !s.is_empty()) {
            append_child(&head, &script(jquery));
        }
        if let Some(css) = style.css_file.as_deref().filter(|s| !s.is_empty()) {
            append_child(
                &head,
                &create_element(
                    "link",
                    &[("rel", "stylesheet"), ("type", "text/css"), ("href", css)],
                ),
            );
        }
        if let Some(js) = style.js_file.as_deref().filter(|s| !s.is_empty()) {
            append_child(&head, &script(js));
        }

        let title_node = create_element("title", &[]);
        append_child(&title_node, &create_text(title));
        append_child(&head, &title_node);

        head
    }
}

fn script(src: &str) -> Handle {
    create_element("script", &[("type", "text/javascript"), ("src", src)])
}

fn zone_block(ident: &str, children: &[Handle]) -> Handle {
    let block = create_element("div", &[("id", ident), ("class", ident)]);
    for child in children {
        append_child(&block, child);
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TuguaConfig;
    use crate::parsers::html::find_nodes;

    fn patterns() -> Patterns {
        Patterns::compile(&TuguaConfig::default()).unwrap()
    }

    fn section(html: &str) -> Handle {
        let dom = html_str_to_dom(&format!("<div id=\"s\">{}</div>", html)).unwrap();
        let div = find_nodes(&dom.document, &["div"]).remove(0);
        detach(&div);
        div
    }

    #[test]
    fn breaks_are_normalized() {
        assert_eq!(normalize_breaks("a<br>b< BR >c<br/>"), "a<br />b<br />c<br/>");
    }

    #[test]
    fn decodes_with_first_working_encoding() {
        let data = "<p>图卦</p>".as_bytes();
        let encodings = vec!["utf-8".to_string(), "gb18030".to_string()];
        let processor = EncodingProcessor::new(&encodings);
        assert_eq!(processor.decode(data), "<p>图卦</p>");

        let gbk = encode_gb18030("<p>图卦</p>");
        let processor = EncodingProcessor::new(&encodings);
        assert_eq!(processor.decode(&gbk), "<p>图卦</p>");
    }

    fn encode_gb18030(text: &str) -> Vec<u8> {
        let (data, _, _) = encoding_rs::GB18030.encode(text);
        data.into_owned()
    }

    #[test]
    fn title_date_must_match() {
        let dom = html_str_to_dom(
            "<html><head><title>首页 【喷嚏图卦20140102】今日 </title></head></html>",
        )
        .unwrap();
        let patterns = patterns();
        let locator = AnchorLocator::new(&patterns);
        assert_eq!(
            locator.check_title(&dom.document, "20140102").unwrap(),
            "【喷嚏图卦20140102】今日"
        );
        assert!(matches!(
            locator.check_title(&dom.document, "20140103"),
            Err(TuguaError::Content(_))
        ));
    }

    #[test]
    fn end_anchor_prefers_following_site_line() {
        let dom = html_str_to_dom(
            "<p>广告联系：dapenti#dapenti.com</p><div><a href=\"/\">喷嚏网：我们</a></div>",
        )
        .unwrap();
        let patterns = patterns();
        let end = AnchorLocator::new(&patterns).find_end(&dom.document).unwrap();
        assert_eq!(get_node_name(&end), Some("div"));
    }

    #[test]
    fn subtitles_are_renumbered() {
        let sections = vec![
            section("<p>【1】一</p>"),
            section("<p>【2】二</p>"),
            section("<p>【5】 三</p>"),
            section("<p>【6】四</p>"),
            section("<p>【】五</p>"),
        ];
        let patterns = patterns();
        let errors = SubtitleValidator::new(&patterns.subtitle, 2)
            .validate(&sections)
            .unwrap();
        assert_eq!(errors, 2);

        let texts: Vec<String> = sections.iter().map(get_text).collect();
        assert_eq!(texts, vec!["【01】一", "【02】二", "【03】三", "【04】四", "【05】五"]);
    }

    #[test]
    fn too_many_subtitle_errors_fail() {
        let sections = vec![section("<p>【3】一</p>"), section("<p>【9】二</p>")];
        let patterns = patterns();
        assert!(SubtitleValidator::new(&patterns.subtitle, 1)
            .validate(&sections)
            .is_err());
    }

    #[test]
    fn zones_split_extra_ad_and_epilogue() {
        let last = section(concat!(
            "<p>【03】正文</p>",
            "<p><img src=\"03_01.jpg\"></p>",
            "<p>附加</p>",
            "<p>广告语</p>",
            "<p><a href=\"http://ad\">http://ad</a></p>",
            "<p>友情提示：请各位河蟹评论。道理你懂的</p>",
            "<p>喷嚏网</p>",
        ));
        let patterns = patterns();
        let zones = ZoneClassifier::new(&patterns.epilogue)
            .classify(&[last.clone()])
            .unwrap();

        let texts = |nodes: &[Handle]| nodes.iter().map(get_text).collect::<Vec<_>>();
        assert_eq!(texts(&zones.extra), vec!["附加"]);
        assert_eq!(texts(&zones.ad), vec!["广告语", "http://ad"]);
        assert_eq!(
            texts(&zones.epilogue),
            vec!["友情提示：请各位河蟹评论。道理你懂的", "喷嚏网"]
        );
        assert_eq!(last.children.borrow().len(), 2);
    }

    #[test]
    fn missing_epilogue_fails() {
        let last = section("<p>【03】正文</p>");
        let patterns = patterns();
        assert!(matches!(
            ZoneClassifier::new(&patterns.epilogue).classify(&[last]),
            Err(TuguaError::Content(_))
        ));
    }
}
