// 该文件是 Kibo Vision （希望号视觉） 项目的一部分。
// src/model.rs - 模型与检测结果
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

use crate::frame::ModelInput;

/// 推理模型，对本库而言是不透明的：输入帧，输出原始的 `[4 + C, N]` 张量
pub trait Model {
  type Error;

  fn infer(&self, input: &ModelInput) -> Result<Vec<f32>, Self::Error>;
}

impl<M: Model + ?Sized> Model for &M {
  type Error = M::Error;

  fn infer(&self, input: &ModelInput) -> Result<Vec<f32>, Self::Error> {
    (**self).infer(input)
  }
}

impl<M: Model + ?Sized> Model for Box<M> {
  type Error = M::Error;

  fn infer(&self, input: &ModelInput) -> Result<Vec<f32>, Self::Error> {
    (**self).infer(input)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  /// 归一化坐标 [0, 1]
  pub xmin: f32,
  pub ymin: f32,
  pub xmax: f32,
  pub ymax: f32,
  /// 最大类别概率
  pub confidence: f32,
  pub class_id: usize,
  pub label: String,
}

impl Detection {
  pub fn bbox(&self) -> [f32; 4] {
    [self.xmin, self.ymin, self.xmax, self.ymax]
  }

  pub fn area(&self) -> f32 {
    (self.xmax - self.xmin) * (self.ymax - self.ymin)
  }

  /// 计算两个边界框的 IoU，并集为 0 时返回 0
  pub fn iou(&self, other: &Detection) -> f32 {
    let x1 = self.xmin.max(other.xmin);
    let y1 = self.ymin.max(other.ymin);
    let x2 = self.xmax.min(other.xmax);
    let y2 = self.ymax.min(other.ymax);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = self.area() + other.area() - intersection;

    if union > 0.0 {
      intersection / union
    } else {
      0.0
    }
  }
}

impl std::fmt::Display for Detection {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{} ({:.2}) [{:.2}, {:.2}, {:.2}, {:.2}]",
      self.label, self.confidence, self.xmin, self.ymin, self.xmax, self.ymax
    )
  }
}

/// NMS 之后的检测结果，按置信度降序排列
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSet {
  pub items: Box<[Detection]>,
}

impl DetectionSet {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
    self.items.iter()
  }

  pub fn into_vec(self) -> Vec<Detection> {
    self.items.into_vec()
  }
}

impl From<Vec<Detection>> for DetectionSet {
  fn from(items: Vec<Detection>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

impl IntoIterator for DetectionSet {
  type Item = Detection;
  type IntoIter = std::vec::IntoIter<Detection>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.into_vec().into_iter()
  }
}

impl<'a> IntoIterator for &'a DetectionSet {
  type Item = &'a Detection;
  type IntoIter = std::slice::Iter<'a, Detection>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}

mod decode;
mod nms;

pub use self::decode::{DecodeConfig, DecodeError, RawTensor, decode};
pub use self::nms::non_max_suppression;

#[cfg(test)]
mod tests {
  use super::*;

  fn det(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Detection {
    Detection {
      xmin,
      ymin,
      xmax,
      ymax,
      confidence: 0.9,
      class_id: 0,
      label: "item".to_string(),
    }
  }

  #[test]
  fn iou_with_itself_is_one() {
    let a = det(0.1, 0.2, 0.5, 0.7);
    assert!((a.iou(&a) - 1.0).abs() < 1e-6);
  }

  #[test]
  fn iou_of_disjoint_boxes_is_zero() {
    let a = det(0.0, 0.0, 0.2, 0.2);
    let b = det(0.5, 0.5, 0.9, 0.9);
    assert_eq!(a.iou(&b), 0.0);
    // 仅共享一条边
    let c = det(0.2, 0.0, 0.4, 0.2);
    assert_eq!(a.iou(&c), 0.0);
  }

  #[test]
  fn iou_of_zero_area_boxes_is_zero() {
    let a = det(0.3, 0.3, 0.3, 0.3);
    assert_eq!(a.iou(&a), 0.0);
  }

  #[test]
  fn iou_partial_overlap() {
    // 交集 0.5 * 1.0，并集 1.5
    let a = det(0.0, 0.0, 1.0, 1.0);
    let b = det(0.5, 0.0, 1.5, 1.0);
    assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
  }
}
