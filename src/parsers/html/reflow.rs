//! 段落重排与图片处理
//!
//! 把转换后的小节重新整理成只含 `p` 的结构：连续文字和笑脸图留在同一段，
//! 普通图片和 flash 各自独占一段，`br` 和 `p` 作为分段点。
//! 图片在这里下载、识别，并按小节编号或笑脸图编号重命名。

use std::fs;
use std::path::Path;

use markup5ever_rcdom::{Handle, NodeData};

use crate::core::ConversionContext;
use crate::error::{TuguaError, TuguaResult};
use crate::media::{extension_from_src, inspect_file, normalize_extension, ImageInfo};
use crate::network::FetchOptions;

use super::dom::{
    append_child, create_element, create_text, get_node_attr, get_node_name, serialize_node,
    set_node_attr, take_children,
};

/// 重排过程中的待定内容
pub struct ReflowState {
    dest: Handle,
    pending_text: String,
    pending_para: Handle,
}

impl ReflowState {
    pub fn new(dest: Handle) -> Self {
        ReflowState {
            dest,
            pending_text: String::new(),
            pending_para: create_element("p", &[]),
        }
    }

    pub fn append_text(&mut self, text: &str) {
        self.pending_text.push_str(text.trim());
    }

    /// 待定文字并入当前段落
    pub fn flush_text(&mut self) {
        if !self.pending_text.is_empty() {
            let text = create_text(self.pending_text.trim());
            append_child(&self.pending_para, &text);
            self.pending_text.clear();
        }
    }

    /// 结束当前段落
    pub fn flush_paragraph(&mut self) {
        self.flush_text();
        if !self.pending_para.children.borrow().is_empty() {
            let finished = std::mem::replace(&mut self.pending_para, create_element("p", &[]));
            append_child(&self.dest, &finished);
        }
    }

    /// 行内节点并入当前段落
    pub fn append_inline(&mut self, node: &Handle) {
        self.flush_text();
        append_child(&self.pending_para, node);
    }

    /// 节点独占一段
    pub fn append_block(&mut self, node: &Handle) {
        self.flush_paragraph();
        let p = create_element("p", &[]);
        append_child(&p, node);
        append_child(&self.dest, &p);
    }

    /// 已成形的段落直接追加
    pub fn append_paragraph(&mut self, p: &Handle) {
        self.flush_paragraph();
        append_child(&self.dest, p);
    }

    pub fn finish(mut self) -> Handle {
        self.flush_paragraph();
        self.dest
    }
}

/// 一个小节的重排
pub struct Reflow<'a> {
    ctx: &'a ConversionContext,
    image_dir: &'a Path,
    info: &'a mut ImageInfo,
    label: &'a str,
}

impl<'a> Reflow<'a> {
    pub fn new(
        ctx: &'a ConversionContext,
        image_dir: &'a Path,
        info: &'a mut ImageInfo,
        label: &'a str,
    ) -> Self {
        Reflow {
            ctx,
            image_dir,
            info,
            label,
        }
    }

    /// 重排 `src` 的子节点，返回新的 `div`
    pub fn run(&mut self, src: &Handle, has_subtitle: bool) -> TuguaResult<Handle> {
        let dest = if self.label.is_empty() {
            create_element("div", &[])
        } else {
            create_element("div", &[("id", self.label)])
        };

        let mut state = ReflowState::new(dest);
        let children: Vec<Handle> = src.children.borrow().clone();
        for child in children.iter() {
            self.reflow_node(&mut state, child)?;
        }
        let dest = state.finish();

        if has_subtitle {
            let first = dest.children.borrow().first().cloned();
            match first {
                Some(first) if get_node_name(&first) == Some("p") => {
                    set_node_attr(&first, "class", Some(self.ctx.config.ident.subtitle.clone()));
                }
                _ => {
                    return Err(TuguaError::Content(format!(
                        "小节 '{}' 中未找到小标题",
                        self.label
                    )))
                }
            }
            set_node_attr(&dest, "class", Some(self.ctx.config.ident.section.clone()));
        }

        Ok(dest)
    }

    fn reflow_node(&mut self, state: &mut ReflowState, node: &Handle) -> TuguaResult<()> {
        if let NodeData::Text { contents } = &node.data {
            state.append_text(&contents.borrow());
            return Ok(());
        }

        match get_node_name(node) {
            Some("embed") => state.append_block(node),
            Some("img") => self.reflow_image(state, node)?,
            Some("a") => self.reflow_link(state, node)?,
            Some("p") => {
                state.flush_paragraph();
                let inner = self.run(node, false)?;
                for child in take_children(&inner) {
                    state.append_paragraph(&child);
                }
            }
            Some("br") => {
                state.flush_paragraph();
                if !node.children.borrow().is_empty() {
                    return Err(TuguaError::Structure(format!(
                        "br 标签不应包含内容: {}",
                        serialize_node(node, true)
                    )));
                }
            }
            _ => {
                return Err(TuguaError::Content(format!(
                    "无法识别的标签: {}",
                    serialize_node(node, true)
                )))
            }
        }

        Ok(())
    }

    fn is_face(&self, node: &Handle) -> bool {
        get_node_name(node) == Some("img")
            && get_node_attr(node, "class").as_deref() == Some(self.ctx.config.ident.face.as_str())
    }

    /// 链接内的文字和笑脸图重新包进链接，普通图片和 flash 拆出独占一段
    fn reflow_link(&mut self, state: &mut ReflowState, link: &Handle) -> TuguaResult<()> {
        let href = get_node_attr(link, "href").unwrap_or_default();
        let inner = self.run(link, false)?;
        let mut run: Vec<Handle> = Vec::new();

        let flush_run = |state: &mut ReflowState, run: &mut Vec<Handle>| {
            if !run.is_empty() {
                let a = create_element("a", &[("href", href.as_str())]);
                for node in run.drain(..) {
                    append_child(&a, &node);
                }
                state.append_inline(&a);
            }
        };

        for paragraph in take_children(&inner) {
            let items: Vec<Handle> = paragraph.children.borrow().clone();
            for item in items.iter() {
                let inline = matches!(item.data, NodeData::Text { .. }) || self.is_face(item);
                if inline {
                    run.push(item.clone());
                    continue;
                }

                flush_run(state, &mut run);
                match get_node_name(item) {
                    Some("img") | Some("embed") => state.append_block(item),
                    _ => {
                        return Err(TuguaError::Content(format!(
                            "链接中包含多个对象: {}",
                            serialize_node(link, true)
                        )))
                    }
                }
            }
            flush_run(state, &mut run);
        }

        Ok(())
    }

    fn reflow_image(&mut self, state: &mut ReflowState, img: &Handle) -> TuguaResult<()> {
        let config = &self.ctx.config;
        if !config.tugua.download_img {
            state.append_inline(img);
            return Ok(());
        }

        let src = get_node_attr(img, "src").unwrap_or_default();
        let face_class = config.ident.face.clone();

        if let Some(cached) = self.info.face(&src) {
            set_node_attr(img, "src", Some(cached.to_string()));
            set_node_attr(img, "class", Some(face_class));
            state.append_inline(img);
            return Ok(());
        }

        let url = src.trim();
        if url.starts_with("file:") {
            tracing::warn!("非法的图片地址 '{}'，已忽略", url);
            return Ok(());
        }

        let mut ext = match extension_from_src(url) {
            Some(ext) => ext,
            None => {
                tracing::warn!(
                    "图片 '{}' 没有扩展名，使用默认扩展名 '{}'",
                    url,
                    config.correction.default_img_ext
                );
                normalize_extension(&config.correction.default_img_ext)
            }
        };

        let number = self.info.count + 1;
        let mut file_name = format!("{}_{:02}.{}", self.label, number, ext);
        let mut path = self.image_dir.join(&file_name);
        let mut is_face = false;

        if !self.ctx.fetcher.fetch(url, &path, &FetchOptions::default()) {
            tracing::error!("图片 '{}' 下载失败", url);
            self.ctx.prompter.gate("图片下载失败")?;
        } else {
            match inspect_file(url, &path, &ext, self.ctx.face_limits()) {
                Ok(descriptor) if descriptor.detected_format.is_none() => {
                    tracing::error!("无法识别图片 '{}' 的格式", path.display());
                    if config.correction.prompt_on_unsure {
                        self.ctx.prompter.gate("无法识别图片格式")?;
                    }
                }
                Ok(descriptor) => {
                    if let Some(actual) = descriptor.format_mismatch() {
                        let renamed = format!("{}_{:02}.{}", self.label, number, actual);
                        let renamed_path = self.image_dir.join(&renamed);
                        tracing::error!(
                            "图片格式不符，重命名 '{}' 为 '{}'",
                            path.display(),
                            renamed_path.display()
                        );
                        if config.correction.prompt_on_unsure {
                            self.ctx.prompter.gate("图片格式与扩展名不符")?;
                        }
                        move_file(&path, &renamed_path)?;
                        ext = actual.to_string();
                        file_name = renamed;
                        path = renamed_path;
                    }
                    is_face = descriptor.is_face;
                }
                Err(err) => {
                    tracing::error!(
                        "无法读取图片文件 '{}'，按普通图片处理: {}",
                        path.display(),
                        err
                    );
                    self.ctx.prompter.gate("无法识别图片文件")?;
                }
            }
        }

        if is_face {
            let face_name = format!("{}_{:02}.{}", face_class, self.info.next_face_number(), ext);
            let face_path = self.image_dir.join(&face_name);
            tracing::info!(
                "发现笑脸图，重命名 '{}' 为 '{}'",
                path.display(),
                face_path.display()
            );
            move_file(&path, &face_path)?;
            self.info.faces.insert(src.clone(), face_name.clone());
            set_node_attr(img, "src", Some(face_name));
            set_node_attr(img, "class", Some(face_class));
            state.append_inline(img);
        } else {
            self.info.count += 1;
            set_node_attr(img, "src", Some(file_name));
            state.append_block(img);
        }

        Ok(())
    }
}

/// 重命名文件，目标已存在时先删除
fn move_file(from: &Path, to: &Path) -> TuguaResult<()> {
    if from == to {
        return Ok(());
    }
    if to.is_file() {
        fs::remove_file(to)?;
    }
    fs::rename(from, to)?;
    Ok(())
}
