// 该文件是 Kibo Vision （希望号视觉） 项目的一部分。
// src/model/nms.rs - 非极大值抑制
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

use tracing::debug;

use crate::model::{Detection, DetectionSet};

/// 按类别的贪心 NMS
///
/// 先按置信度降序稳定排序（同分保持原顺序），然后依次保留未被抑制的框，
/// 并抑制其后同类别且 IoU 大于阈值的框。不同类别之间互不抑制。
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> DetectionSet {
  detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut suppressed = vec![false; detections.len()];
  let mut result = Vec::new();

  for i in 0..detections.len() {
    if suppressed[i] {
      continue;
    }

    let best = &detections[i];
    for j in (i + 1)..detections.len() {
      if suppressed[j] || detections[j].class_id != best.class_id {
        continue;
      }
      if best.iou(&detections[j]) > iou_threshold {
        suppressed[j] = true;
      }
    }
  }

  let total = detections.len();
  for (item, suppressed) in detections.into_iter().zip(suppressed) {
    if !suppressed {
      result.push(item);
    }
  }

  debug!("NMS: {} 个候选框保留 {} 个", total, result.len());
  DetectionSet::from(result)
}
