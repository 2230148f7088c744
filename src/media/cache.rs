//! 图片信息缓存
//!
//! 按日期记录已识别的笑脸图，转换中途失败后重新运行时可以复用。
//! 每转换完一个小节写盘一次，整篇成功后删除该日期的记录。

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TuguaResult;

/// 单个日期的图片信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// 当前小节已保存的普通图片数
    #[serde(default)]
    pub count: u32,
    /// 源地址到笑脸图文件名
    #[serde(default)]
    pub faces: BTreeMap<String, String>,
}

impl ImageInfo {
    pub fn face(&self, source_url: &str) -> Option<&str> {
        self.faces.get(source_url).map(String::as_str)
    }

    /// 下一个笑脸图编号
    pub fn next_face_number(&self) -> usize {
        self.faces.len() + 1
    }
}

/// 图片信息文件
#[derive(Debug)]
pub struct ImageInfoStore {
    path: PathBuf,
    records: BTreeMap<String, ImageInfo>,
}

impl ImageInfoStore {
    /// 读取缓存文件，不存在或为空时返回空记录
    pub fn load(path: &Path) -> TuguaResult<Self> {
        let records = match fs::read(path) {
            Ok(data) if !data.is_empty() => serde_json::from_slice(&data)?,
            Ok(_) => BTreeMap::new(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    /// 取出日期记录，计数清零
    pub fn get(&self, date: &str) -> ImageInfo {
        let mut info = self.records.get(date).cloned().unwrap_or_default();
        info.count = 0;
        info
    }

    pub fn put(&mut self, date: &str, info: &ImageInfo) {
        self.records.insert(date.to_string(), info.clone());
    }

    pub fn remove(&mut self, date: &str) -> Option<ImageInfo> {
        self.records.remove(date)
    }

    pub fn save(&self) -> TuguaResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let data = serde_json::to_vec_pretty(&self.records)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageInfoStore::load(&dir.path().join("img_info.json")).unwrap();
        assert_eq!(store.get("20140102"), ImageInfo::default());
    }

    #[test]
    fn keeps_faces_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("src").join("img_info.json");

        let mut store = ImageInfoStore::load(&path).unwrap();
        let mut info = store.get("20140102");
        info.count = 3;
        info.faces
            .insert("http://a/smile.gif".to_string(), "face_01.gif".to_string());
        store.put("20140102", &info);
        store.save().unwrap();

        let store = ImageInfoStore::load(&path).unwrap();
        let info = store.get("20140102");
        assert_eq!(info.count, 0);
        assert_eq!(info.face("http://a/smile.gif"), Some("face_01.gif"));
        assert_eq!(info.next_face_number(), 2);
    }

    #[test]
    fn remove_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img_info.json");
        let mut store = ImageInfoStore::load(&path).unwrap();
        let mut info = ImageInfo::default();
        info.faces
            .insert("http://a/smile.gif".to_string(), "face_01.gif".to_string());
        store.put("20140102", &info);
        store.put("20140103", &info);
        assert!(store.remove("20140102").is_some());
        store.save().unwrap();

        let store = ImageInfoStore::load(&path).unwrap();
        assert_eq!(store.get("20140102"), ImageInfo::default());
        assert_eq!(store.get("20140103").face("http://a/smile.gif"), Some("face_01.gif"));
    }
}
