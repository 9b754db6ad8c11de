// 该文件是 Kibo Vision （希望号视觉） 项目的一部分。
// src/output/record.rs - 检测结果文本记录
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

use serde_json::{Value, json};

use crate::model::DetectionSet;

/// 每行一个检测结果：`名称, 置信度, x_min, y_min, x_max, y_max`
#[derive(Debug, Clone, Copy)]
pub struct Record {
  /// 为 false 时第一列写类别索引
  pub label_with_name: bool,
}

impl Default for Record {
  fn default() -> Self {
    Self {
      label_with_name: true,
    }
  }
}

impl Record {
  pub fn render(&self, result: &DetectionSet) -> String {
    let mut records = Vec::with_capacity(result.len());
    for item in result {
      let name = if self.label_with_name {
        item.label.clone()
      } else {
        format!("{}", item.class_id)
      };
      records.push(format!(
        "{}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}",
        name, item.confidence, item.xmin, item.ymin, item.xmax, item.ymax
      ));
    }
    records.join("\n")
  }

  pub fn record(&self, result: &DetectionSet, path: &std::path::Path) -> Result<(), std::io::Error> {
    std::fs::write(path, self.render(result))
  }
}

pub fn to_json(result: &DetectionSet) -> Value {
  Value::Array(
    result
      .iter()
      .map(|item| {
        json!({
          "label": item.label,
          "class_id": item.class_id,
          "confidence": item.confidence,
          "bbox": [item.xmin, item.ymin, item.xmax, item.ymax],
        })
      })
      .collect(),
  )
}
