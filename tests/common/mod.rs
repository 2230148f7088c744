// 集成测试公共模块
//
// 提供模拟下载器、确认策略、样例图片和样例文档

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::rc::Rc;

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};

use tugua::config::Config;
use tugua::network::{FetchOptions, Fetcher};
use tugua::prompt::{AutoConfirm, Prompter};
use tugua::ConversionContext;

pub const DATE: &str = "20140102";
pub const PAGE_URL: &str = "http://www.dapenti.com/blog/more.asp?id=1";
pub const SMILE_URL: &str = "http://img.example.com/smile.gif";
pub const PHOTO_URL: &str = "http://img.example.com/photo.jpg";
pub const CHART_URL: &str = "http://img.example.com/chart.png";

/// 按地址返回固定内容的下载器，记录每次调用
pub struct MockFetcher {
    resources: HashMap<String, Vec<u8>>,
    calls: Rc<RefCell<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        MockFetcher {
            resources: HashMap::new(),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn with(mut self, url: &str, data: Vec<u8>) -> Self {
        self.resources.insert(url.to_string(), data);
        self
    }

    pub fn calls(&self) -> Rc<RefCell<Vec<String>>> {
        self.calls.clone()
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, url: &str, path: &Path, options: &FetchOptions) -> bool {
        self.calls.borrow_mut().push(url.to_string());
        match self.resources.get(url) {
            Some(data) => {
                let data = options
                    .transforms
                    .iter()
                    .fold(data.clone(), |data, transform| transform.apply(&data));
                fs::write(path, data).is_ok()
            }
            None => false,
        }
    }
}

/// 总是拒绝继续
pub struct Refuse;

impl Prompter for Refuse {
    fn confirm(&self, _message: &str) -> bool {
        false
    }
}

fn encoded(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut data = Cursor::new(Vec::new());
    image.write_to(&mut data, format).unwrap();
    data.into_inner()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encoded(DynamicImage::ImageRgba8(RgbaImage::new(width, height)), ImageFormat::Png)
}

pub fn gif(width: u32, height: u32) -> Vec<u8> {
    encoded(DynamicImage::ImageRgba8(RgbaImage::new(width, height)), ImageFormat::Gif)
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encoded(DynamicImage::ImageRgb8(RgbImage::new(width, height)), ImageFormat::Jpeg)
}

/// 样例图片：一个笑脸图，一张照片，一张图表
pub fn default_fetcher() -> MockFetcher {
    MockFetcher::new()
        .with(SMILE_URL, gif(20, 20))
        .with(PHOTO_URL, jpeg(400, 300))
        .with(CHART_URL, png(640, 480))
}

pub fn context_with(fetcher: MockFetcher, prompter: Box<dyn Prompter>) -> ConversionContext {
    ConversionContext::new(Config::default(), Box::new(fetcher), prompter).unwrap()
}

pub fn context(fetcher: MockFetcher) -> ConversionContext {
    context_with(fetcher, Box::new(AutoConfirm))
}

/// 组装一篇样例图卦，`sections` 为各节正文（含小标题段落）
pub fn document(title: &str, sections: &[&str]) -> String {
    format!(
        concat!(
            "<html><head><title>{}</title></head><body>\n",
            "<div class=\"main\">\n",
            "<p>以下内容，有可能引起内心冲突或愤怒等不适症状。</p>\n",
            "<p>导语<img src=\"{}\">文字</p>\n",
            "{}\n",
            "<p>友情提示：请各位河蟹评论。道理你懂的</p>\n",
            "<p>广告联系：dapenti#dapenti.com</p>\n",
            "<p>喷嚏网：阅读、发现和分享</p>\n",
            "</div>\n",
            "</body></html>\n",
        ),
        title,
        SMILE_URL,
        sections.join("\n"),
    )
}

pub fn sample_sections() -> Vec<String> {
    vec![
        format!(
            "<p>【1】第一节</p>\n<p>正文一<br>第二行</p>\n<p><img src=\"{}\"></p>",
            PHOTO_URL
        ),
        format!(
            "<p>【2】第二节</p>\n<p><a href=\"http://news.example.com/a\">链接<img src=\"{}\"></a></p>",
            SMILE_URL
        ),
        format!(
            concat!(
                "<p>【5】第三节</p>\n<p>正文三</p>\n<p><img src=\"{}\"></p>\n",
                "<p>附加内容</p>\n<p>广告</p>\n",
                "<p><a href=\"http://ad.example.com/\">http://ad.example.com/</a></p>",
            ),
            CHART_URL
        ),
    ]
}

pub fn sample_document() -> String {
    let sections = sample_sections();
    let sections: Vec<&str> = sections.iter().map(String::as_str).collect();
    document("【喷嚏图卦20140102】今天的标题", &sections)
}
