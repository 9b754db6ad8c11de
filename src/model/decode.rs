// 该文件是 Kibo Vision （希望号视觉） 项目的一部分。
// src/model/decode.rs - 检测张量解码
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

use thiserror::Error;
use tracing::debug;

use crate::{
  label::LabelTable,
  model::{Detection, DetectionSet, nms::non_max_suppression},
};

const X_CENTER_ROW: usize = 0;
const Y_CENTER_ROW: usize = 1;
const WIDTH_ROW: usize = 2;
const HEIGHT_ROW: usize = 3;
const FIRST_CLASS_ROW: usize = 4;

pub const DEFAULT_NUM_CLASSES: usize = 11;
pub const DEFAULT_NUM_SLOTS: usize = 4725;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const STRICT_CONFIDENCE_THRESHOLD: f32 = 0.65;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
  #[error("张量大小不匹配: 期望 {expected} (= (4 + {num_classes}) x {num_slots}), 实际 {actual}")]
  SizeMismatch {
    expected: usize,
    actual: usize,
    num_classes: usize,
    num_slots: usize,
  },
  #[error("解码配置无效: {0}")]
  InvalidConfig(String),
  #[error("原始字节长度 {0} 不是 4 的整数倍")]
  MisalignedBytes(usize),
}

/// 解码参数，`num_classes`/`num_slots` 必须与上游模型一致
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeConfig {
  pub num_classes: usize,
  pub num_slots: usize,
  pub confidence_threshold: f32,
  pub iou_threshold: f32,
}

impl Default for DecodeConfig {
  fn default() -> Self {
    Self {
      num_classes: DEFAULT_NUM_CLASSES,
      num_slots: DEFAULT_NUM_SLOTS,
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
    }
  }
}

impl DecodeConfig {
  pub fn new(num_classes: usize, num_slots: usize) -> Self {
    Self {
      num_classes,
      num_slots,
      ..Self::default()
    }
  }

  /// 较严格的部署配置，置信度阈值 0.65
  pub fn strict() -> Self {
    Self::default().with_confidence_threshold(STRICT_CONFIDENCE_THRESHOLD)
  }

  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }

  /// 张量元素总数 `(4 + C) x N`，溢出时为 None
  pub fn expected_len(&self) -> Option<usize> {
    FIRST_CLASS_ROW
      .checked_add(self.num_classes)?
      .checked_mul(self.num_slots)
  }

  pub fn validate(&self) -> Result<(), DecodeError> {
    if self.num_classes == 0 {
      return Err(DecodeError::InvalidConfig("类别数量必须大于 0".to_string()));
    }
    if self.expected_len().is_none() {
      return Err(DecodeError::InvalidConfig(format!(
        "张量大小 (4 + {}) x {} 溢出",
        self.num_classes, self.num_slots
      )));
    }
    if !(0.0..=1.0).contains(&self.confidence_threshold) {
      return Err(DecodeError::InvalidConfig(format!(
        "置信度阈值 {} 超出 [0, 1]",
        self.confidence_threshold
      )));
    }
    if !(0.0..=1.0).contains(&self.iou_threshold) {
      return Err(DecodeError::InvalidConfig(format!(
        "IoU 阈值 {} 超出 [0, 1]",
        self.iou_threshold
      )));
    }
    Ok(())
  }
}

/// 平台字节序的原始输出张量
#[derive(Debug, Clone, PartialEq)]
pub struct RawTensor {
  data: Box<[f32]>,
}

impl RawTensor {
  pub fn from_ne_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
    if bytes.len() % 4 != 0 {
      return Err(DecodeError::MisalignedBytes(bytes.len()));
    }

    let data = bytes
      .chunks_exact(4)
      .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
      .collect();
    Ok(Self { data })
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }
}

impl From<Vec<f32>> for RawTensor {
  fn from(data: Vec<f32>) -> Self {
    Self {
      data: data.into_boxed_slice(),
    }
  }
}

impl AsRef<[f32]> for RawTensor {
  fn as_ref(&self) -> &[f32] {
    &self.data
  }
}

/// 取最大类别概率，并列时保留索引最小的类别
fn best_class(raw: &[f32], num_slots: usize, num_classes: usize, slot: usize) -> (usize, f32) {
  let mut class_id = 0usize;
  let mut max_prob = raw[FIRST_CLASS_ROW * num_slots + slot];
  for c in 1..num_classes {
    let prob = raw[(FIRST_CLASS_ROW + c) * num_slots + slot];
    if prob > max_prob {
      max_prob = prob;
      class_id = c;
    }
  }
  (class_id, max_prob)
}

/// 解码 `[4 + C, N]` 原始张量并执行按类别的 NMS
pub fn decode(
  raw: &[f32],
  config: &DecodeConfig,
  labels: &LabelTable,
) -> Result<DetectionSet, DecodeError> {
  config.validate()?;

  // validate 已排除溢出
  let expected = config.expected_len().unwrap_or(usize::MAX);
  if raw.len() != expected {
    return Err(DecodeError::SizeMismatch {
      expected,
      actual: raw.len(),
      num_classes: config.num_classes,
      num_slots: config.num_slots,
    });
  }

  let n = config.num_slots;
  let mut items = Vec::new();

  for slot in 0..n {
    let (class_id, confidence) = best_class(raw, n, config.num_classes, slot);
    // NaN 也在这里被拒绝
    if !(confidence >= config.confidence_threshold) {
      continue;
    }

    let cx = raw[X_CENTER_ROW * n + slot];
    let cy = raw[Y_CENTER_ROW * n + slot];
    let w = raw[WIDTH_ROW * n + slot];
    let h = raw[HEIGHT_ROW * n + slot];

    let xmin = (cx - w / 2.0).clamp(0.0, 1.0);
    let ymin = (cy - h / 2.0).clamp(0.0, 1.0);
    let xmax = (cx + w / 2.0).clamp(0.0, 1.0);
    let ymax = (cy + h / 2.0).clamp(0.0, 1.0);

    if !(xmin < xmax && ymin < ymax) {
      debug!(
        "槽位 {} 的边界框无效: [{}, {}, {}, {}]，跳过",
        slot, xmin, ymin, xmax, ymax
      );
      continue;
    }

    items.push(Detection {
      xmin,
      ymin,
      xmax,
      ymax,
      confidence,
      class_id,
      label: labels.label_for(class_id).into_owned(),
    });
  }

  debug!("阈值过滤后剩余 {} 个候选框", items.len());
  let result = non_max_suppression(items, config.iou_threshold);

  if result.is_empty() {
    debug!("NMS 之后没有检测到物体");
  } else {
    for item in result.iter() {
      debug!("检测结果: {}", item);
    }
  }

  Ok(result)
}
