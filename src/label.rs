// 该文件是 Kibo Vision （希望号视觉） 项目的一部分。
// src/label.rs - 类别标签表
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{borrow::Cow, path::Path, sync::Arc};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("标签文件读取错误: {0}")]
  IoError(std::io::Error),
}

impl From<std::io::Error> for LabelError {
  fn from(err: std::io::Error) -> Self {
    LabelError::IoError(err)
  }
}

/// 类别标签表，行号即类别索引
///
/// 启动时加载一次，之后只读；内部使用 `Arc`，克隆开销很小，可在线程间共享。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
  labels: Arc<[String]>,
}

impl LabelTable {
  pub fn new<I, S>(labels: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      labels: labels.into_iter().map(Into::into).collect(),
    }
  }

  /// 按行解析标签文本，兼容 `\r\n`，末尾空行不计入
  pub fn parse(text: &str) -> Self {
    let labels = Self::new(text.lines());
    debug!("解析到 {} 个标签", labels.len());
    labels
  }

  pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LabelError> {
    let path = path.as_ref();
    info!("加载标签文件: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    Ok(Self::parse(&text))
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn get(&self, class_id: usize) -> Option<&str> {
    self.labels.get(class_id).map(String::as_str)
  }

  /// 越界的类别索引返回占位标签 `Unknown_Class_<id>`
  pub fn label_for(&self, class_id: usize) -> Cow<'_, str> {
    match self.get(class_id) {
      Some(label) => Cow::Borrowed(label),
      None => Cow::Owned(format!("Unknown_Class_{}", class_id)),
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.labels.iter().map(String::as_str)
  }
}

impl<S: Into<String>> FromIterator<S> for LabelTable {
  fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
    Self::new(iter)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_keeps_line_order() {
    let labels = LabelTable::parse("coin\r\ncompass\nkey\n");
    assert_eq!(labels.len(), 3);
    assert_eq!(labels.get(0), Some("coin"));
    assert_eq!(labels.get(1), Some("compass"));
    assert_eq!(labels.get(2), Some("key"));
  }

  #[test]
  fn out_of_range_gets_placeholder() {
    let labels = LabelTable::new(["crystal"]);
    assert_eq!(labels.label_for(0), "crystal");
    assert_eq!(labels.label_for(7), "Unknown_Class_7");
    assert_eq!(LabelTable::default().label_for(0), "Unknown_Class_0");
  }

  #[test]
  fn load_reads_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("labels.txt");
    std::fs::write(&path, "emerald\ndiamond\n").expect("write labels");

    let labels = LabelTable::load(&path).expect("load labels");
    assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["emerald", "diamond"]);
  }

  #[test]
  fn load_missing_file_is_error() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let result = LabelTable::load(dir.path().join("missing.txt"));
    assert!(matches!(result, Err(LabelError::IoError(_))));
  }
}
