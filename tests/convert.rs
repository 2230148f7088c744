//! 整篇图卦转换的集成测试

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod passing {
    use std::fs;
    use std::path::Path;

    use tugua::media::{ImageInfo, ImageInfoStore};
    use tugua::{catalogue, convert_document, download_tugua};

    use crate::common::*;

    fn convert_sample(dir: &Path) -> (String, Vec<String>) {
        let fetcher = default_fetcher();
        let calls = fetcher.calls();
        let mut ctx = context(fetcher);
        let path = convert_document(
            &mut ctx,
            sample_document().as_bytes(),
            DATE,
            PAGE_URL,
            dir,
        )
        .unwrap();

        assert_eq!(path, dir.join(DATE).join("index.html"));
        let output = fs::read_to_string(path).unwrap();
        let calls = calls.borrow().clone();
        (output, calls)
    }

    #[test]
    fn converts_sample_document() {
        let dir = tempfile::tempdir().unwrap();
        let (output, _) = convert_sample(dir.path());

        assert!(output.starts_with("<html><head>"));
        assert!(output.contains(
            r#"<meta http-equiv="Content-Type" content="text/html; charset=utf-8">"#
        ));
        assert!(output.contains("<title>【喷嚏图卦20140102】今天的标题</title>"));
        assert!(output.contains(&format!(
            r#"<div id="title" class="title"><p><a href="{}">【喷嚏图卦20140102】今天的标题</a></p></div>"#,
            PAGE_URL
        )));
        assert!(output.contains(r#"<div id="prologue" class="prologue">"#));
        assert!(output.contains("<p>以下内容，有可能引起内心冲突或愤怒等不适症状。</p>"));
        assert!(output.contains(r#"<div id="01" class="section">"#));
        assert!(output.contains(r#"<div id="03" class="section">"#));
        assert!(!output.contains(r#"<div id="04""#));
    }

    #[test]
    fn subtitles_are_renumbered() {
        let dir = tempfile::tempdir().unwrap();
        let (output, _) = convert_sample(dir.path());

        assert!(output.contains(r#"<p class="subtitle">【01】第一节</p>"#));
        assert!(output.contains(r#"<p class="subtitle">【02】第二节</p>"#));
        assert!(output.contains(r#"<p class="subtitle">【03】第三节</p>"#));
        assert!(!output.contains("【5】"));
    }

    #[test]
    fn breaks_split_paragraphs() {
        let dir = tempfile::tempdir().unwrap();
        let (output, _) = convert_sample(dir.path());

        assert!(output.contains("<p>正文一</p><p>第二行</p>"));
        assert!(!output.contains("<br>"));
    }

    #[test]
    fn faces_are_shared_and_downloaded_once() {
        let dir = tempfile::tempdir().unwrap();
        let (output, calls) = convert_sample(dir.path());

        let face = r#"<img alt="" src="face_01.gif" class="face">"#;
        assert_eq!(output.matches(face).count(), 2);
        assert!(output.contains(&format!(
            r#"<p>导语{}文字</p>"#,
            face
        )));
        assert!(output.contains(&format!(
            r#"<p><a href="http://news.example.com/a">链接{}</a></p>"#,
            face
        )));
        assert_eq!(calls.iter().filter(|url| *url == SMILE_URL).count(), 1);
    }

    #[test]
    fn images_are_numbered_per_section() {
        let dir = tempfile::tempdir().unwrap();
        let (output, calls) = convert_sample(dir.path());
        let image_dir = dir.path().join(DATE);

        assert!(image_dir.join("face_01.gif").is_file());
        assert!(image_dir.join("01_01.jpg").is_file());
        assert!(image_dir.join("03_01.png").is_file());
        assert!(!image_dir.join("_01.gif").exists());

        assert!(output.contains(r#"<p><img alt="" src="01_01.jpg"></p>"#));
        assert!(output.contains(r#"<p><img alt="" src="03_01.png"></p>"#));
        assert_eq!(calls, vec![SMILE_URL, PHOTO_URL, CHART_URL]);
    }

    #[test]
    fn last_section_is_split_into_zones() {
        let dir = tempfile::tempdir().unwrap();
        let (output, _) = convert_sample(dir.path());

        assert!(output.contains(r#"<div id="extra" class="extra"><p>附加内容</p></div>"#));
        assert!(output.contains(concat!(
            r#"<div id="ad" class="ad"><p>广告</p>"#,
            r#"<p><a href="http://ad.example.com/">http://ad.example.com/</a></p></div>"#,
        )));
        assert!(output.contains(concat!(
            r#"<div id="epilogue" class="epilogue"><p>友情提示：请各位河蟹评论。道理你懂的</p>"#,
            "<p>广告联系：dapenti#dapenti.com</p>",
            "<p>喷嚏网：阅读、发现和分享</p></div>",
        )));
        assert!(output.trim_end().ends_with("</div></body></html>"));

        let section = output
            .split(r#"<div id="03" class="section">"#)
            .nth(1)
            .and_then(|rest| rest.split("</div>").next())
            .unwrap();
        assert!(section.contains("<p>正文三</p>"));
        assert!(!section.contains("附加内容"));
        assert!(!section.contains("友情提示"));
    }

    #[test]
    fn image_info_is_cleared_after_success() {
        let dir = tempfile::tempdir().unwrap();
        convert_sample(dir.path());

        let store = ImageInfoStore::load(&dir.path().join("src").join("img_info.json")).unwrap();
        assert_eq!(store.get(DATE), ImageInfo::default());
    }

    #[test]
    fn conversion_is_repeatable() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();

        let (a, _) = convert_sample(first.path());
        let (b, _) = convert_sample(second.path());
        assert_eq!(a, b);
    }

    #[test]
    fn gb18030_source_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let sample = sample_document();
        let (data, _, had_errors) = encoding_rs::GB18030.encode(&sample);
        assert!(!had_errors);

        let mut ctx = context(default_fetcher());
        let path = convert_document(&mut ctx, &data, DATE, PAGE_URL, dir.path()).unwrap();
        let output = fs::read_to_string(path).unwrap();
        assert!(output.contains(r#"<p class="subtitle">【03】第三节</p>"#));
    }

    #[test]
    fn download_keeps_source_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = default_fetcher().with(PAGE_URL, sample_document().into_bytes());
        let calls = fetcher.calls();
        let mut ctx = context(fetcher);

        let path = download_tugua(&mut ctx, PAGE_URL, dir.path(), DATE).unwrap();
        assert!(path.is_file());
        assert_eq!(calls.borrow()[0], PAGE_URL);

        let snapshot = dir.path().join("src").join("20140102.html");
        assert_eq!(fs::read_to_string(snapshot).unwrap(), sample_document());
    }

    #[test]
    fn catalogue_converts_new_dates() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_url = "http://www.dapenti.com/blog/blog.asp?subjectid=70";
        let catalog = format!(
            concat!(
                "<html><body><ul>",
                "<li><a href=\"{}\">【喷嚏图卦20140102】今天的标题</a></li>",
                "<li><a href=\"more.asp?id=0\">【喷嚏图卦20140101】昨天的标题</a></li>",
                "</ul></body></html>",
            ),
            PAGE_URL
        );
        let fetcher = default_fetcher()
            .with(catalog_url, catalog.into_bytes())
            .with(PAGE_URL, sample_document().into_bytes());
        let mut ctx = context(fetcher);

        // 20140101 的页面无法下载
        let summary = catalogue(&mut ctx, catalog_url, dir.path(), None).unwrap();
        assert_eq!((summary.converted, summary.failed), (1, 1));
        assert!(dir.path().join(DATE).join("index.html").is_file());

        let summary = catalogue(&mut ctx, catalog_url, dir.path(), None).unwrap();
        assert_eq!((summary.converted, summary.failed), (0, 1));
    }

    #[test]
    fn catalogue_respects_min_date() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_url = "http://www.dapenti.com/blog/blog.asp?subjectid=70";
        let catalog = format!(
            "<a href=\"{}\">【喷嚏图卦20140102】今天的标题</a>",
            PAGE_URL
        );
        let fetcher = default_fetcher()
            .with(catalog_url, catalog.into_bytes())
            .with(PAGE_URL, sample_document().into_bytes());
        let calls = fetcher.calls();

        let mut config = tugua::Config::default();
        config.tugua.min_date = Some("20140103".to_string());
        let mut ctx = tugua::ConversionContext::new(
            config,
            Box::new(fetcher),
            Box::new(tugua::AutoConfirm),
        )
        .unwrap();

        let summary = catalogue(&mut ctx, catalog_url, dir.path(), None).unwrap();
        assert_eq!((summary.converted, summary.failed), (0, 0));
        assert_eq!(calls.borrow().as_slice(), [catalog_url]);
    }

    #[test]
    fn catalogue_reuses_existing_snapshot_for_chosen_date() {
        let dir = tempfile::tempdir().unwrap();
        let src_dir = dir.path().join("src");
        fs::create_dir_all(&src_dir).unwrap();
        fs::write(src_dir.join("20140102.html"), sample_document()).unwrap();

        let fetcher = default_fetcher();
        let calls = fetcher.calls();
        let mut ctx = context(fetcher);

        let summary = catalogue(&mut ctx, "http://unused.example.com/", dir.path(), Some(DATE))
            .unwrap();
        assert_eq!(summary.converted, 1);
        assert!(!calls.borrow().iter().any(|url| url == "http://unused.example.com/"));

        // 没有来源地址时标题链接为空
        let output = fs::read_to_string(dir.path().join(DATE).join("index.html")).unwrap();
        assert!(output.contains(r#"<a href="">【喷嚏图卦20140102】今天的标题</a>"#));
    }
}

//  ███████╗ █████╗ ██╗██╗     ██╗███╗   ██╗ ██████╗
//  ██╔════╝██╔══██╗██║██║     ██║████╗  ██║██╔════╝
//  █████╗  ███████║██║██║     ██║██╔██╗ ██║██║  ███╗
//  ██╔══╝  ██╔══██║██║██║     ██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║██║███████╗██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚═╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod failing {
    use std::fs;

    use tugua::media::ImageInfoStore;
    use tugua::{catalogue, convert_document, TuguaError};

    use crate::common::*;

    fn convert(html: &str, date: &str, fetcher: MockFetcher) -> (tempfile::TempDir, TuguaError) {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(fetcher);
        let err = convert_document(&mut ctx, html.as_bytes(), date, PAGE_URL, dir.path())
            .unwrap_err();
        (dir, err)
    }

    #[test]
    fn date_mismatch() {
        let (dir, err) = convert(&sample_document(), "20140103", default_fetcher());
        assert!(matches!(err, TuguaError::Content(_)));
        assert!(!dir.path().join("20140103").join("index.html").exists());
    }

    #[test]
    fn missing_start_anchor() {
        let html = sample_document().replace("以下内容，有可能引起内心冲突或愤怒等不适症状。", "开场白");
        let (_, err) = convert(&html, DATE, default_fetcher());
        assert!(matches!(err, TuguaError::Content(_)));
    }

    #[test]
    fn missing_epilogue() {
        let html = sample_document().replace("<p>友情提示：请各位河蟹评论。道理你懂的</p>\n", "");
        let (dir, err) = convert(&html, DATE, default_fetcher());
        assert!(matches!(err, TuguaError::Content(_)));
        assert!(!dir.path().join(DATE).join("index.html").exists());
    }

    #[test]
    fn too_many_subtitle_errors() {
        let html = document(
            "【喷嚏图卦20140102】今天的标题",
            &[
                "<p>【1】一</p><p>甲</p>",
                "<p>【3】二</p><p>乙</p>",
                "<p>【6】三</p><p>丙</p>",
                "<p>【9】四</p><p>丁</p>",
            ],
        );
        let (_, err) = convert(&html, DATE, default_fetcher());
        assert!(matches!(err, TuguaError::Content(_)));
    }

    #[test]
    fn no_sections() {
        let html = document("【喷嚏图卦20140102】今天的标题", &["<p>没有小标题</p>"]);
        let (_, err) = convert(&html, DATE, default_fetcher());
        assert!(matches!(err, TuguaError::Content(_)));
    }

    #[test]
    fn table_in_section_keeps_image_info() {
        let html = document(
            "【喷嚏图卦20140102】今天的标题",
            &[
                "<p>【1】一</p><p>甲</p>",
                "<p>【2】二</p><table><tr><td>表格</td></tr></table>",
            ],
        );
        let (dir, err) = convert(&html, DATE, default_fetcher());
        assert!(matches!(err, TuguaError::Content(_)));

        let store = ImageInfoStore::load(&dir.path().join("src").join("img_info.json")).unwrap();
        assert_eq!(store.get(DATE).face(SMILE_URL), Some("face_01.gif"));
        assert!(dir.path().join(DATE).join("face_01.gif").is_file());
    }

    #[test]
    fn refused_image_download_aborts() {
        let fetcher = MockFetcher::new()
            .with(SMILE_URL, gif(20, 20))
            .with(CHART_URL, png(640, 480));
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context_with(fetcher, Box::new(Refuse));

        let err = convert_document(
            &mut ctx,
            sample_document().as_bytes(),
            DATE,
            PAGE_URL,
            dir.path(),
        )
        .unwrap_err();
        assert!(err.is_aborted());
        assert!(!dir.path().join(DATE).join("index.html").exists());
        assert!(fs::read_dir(dir.path().join(DATE)).is_ok());
    }

    #[test]
    fn refusal_stops_catalogue_batch() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_url = "http://www.dapenti.com/blog/blog.asp?subjectid=70";
        let catalog = format!(
            concat!(
                "<a href=\"{}\">【喷嚏图卦20140102】今天的标题</a>",
                "<a href=\"more.asp?id=0\">【喷嚏图卦20140101】昨天的标题</a>",
            ),
            PAGE_URL
        );
        // 缺少照片，下载失败后拒绝继续
        let fetcher = MockFetcher::new()
            .with(SMILE_URL, gif(20, 20))
            .with(CHART_URL, png(640, 480))
            .with(catalog_url, catalog.into_bytes())
            .with(PAGE_URL, sample_document().into_bytes());
        let calls = fetcher.calls();
        let mut ctx = context_with(fetcher, Box::new(Refuse));

        let err = catalogue(&mut ctx, catalog_url, dir.path(), None).unwrap_err();
        assert!(err.is_aborted());
        assert!(!calls
            .borrow()
            .iter()
            .any(|url| url == "http://www.dapenti.com/blog/more.asp?id=0"));
    }
}
