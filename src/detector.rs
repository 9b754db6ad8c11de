// 该文件是 Kibo Vision （希望号视觉） 项目的一部分。
// src/detector.rs - 检测流程：裁剪、预处理、推理、后处理
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

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  crop::{CropConfig, QuadCropper},
  frame::{InputError, InputShape, prepare_input},
  label::LabelTable,
  model::{DecodeConfig, DecodeError, DetectionSet, Model, decode},
};

#[derive(Error, Debug)]
pub enum DetectorError<E> {
  #[error("输入预处理错误: {0}")]
  InputError(InputError),
  #[error("模型推理错误: {0}")]
  ModelError(E),
  #[error("后处理错误: {0}")]
  DecodeError(DecodeError),
}

impl<E> From<InputError> for DetectorError<E> {
  fn from(err: InputError) -> Self {
    DetectorError::InputError(err)
  }
}

impl<E> From<DecodeError> for DetectorError<E> {
  fn from(err: DecodeError) -> Self {
    DetectorError::DecodeError(err)
  }
}

pub struct DetectorBuilder {
  decode: DecodeConfig,
  crop: Option<CropConfig>,
  input_shape: InputShape,
  labels: LabelTable,
}

impl Default for DetectorBuilder {
  fn default() -> Self {
    Self {
      decode: DecodeConfig::default(),
      crop: Some(CropConfig::default()),
      input_shape: InputShape::default(),
      labels: LabelTable::default(),
    }
  }
}

impl DetectorBuilder {
  pub fn decode(mut self, config: DecodeConfig) -> Self {
    self.decode = config;
    self
  }

  /// `None` 表示跳过裁剪
  pub fn crop(mut self, config: Option<CropConfig>) -> Self {
    self.crop = config;
    self
  }

  pub fn input_shape(mut self, shape: InputShape) -> Self {
    self.input_shape = shape;
    self
  }

  pub fn labels(mut self, labels: LabelTable) -> Self {
    self.labels = labels;
    self
  }

  pub fn build<M: Model>(self, model: M) -> Result<Detector<M>, DecodeError> {
    self.decode.validate()?;
    if !self.labels.is_empty() && self.labels.len() != self.decode.num_classes {
      warn!(
        "标签数量 {} 与类别数量 {} 不一致",
        self.labels.len(),
        self.decode.num_classes
      );
    }

    info!(
      "检测器配置: {} 类, {} 个槽位, 置信度阈值 {}, IoU 阈值 {}, 裁剪 {}",
      self.decode.num_classes,
      self.decode.num_slots,
      self.decode.confidence_threshold,
      self.decode.iou_threshold,
      if self.crop.is_some() { "开启" } else { "关闭" }
    );

    Ok(Detector {
      model,
      cropper: self.crop.map(QuadCropper::new),
      decode: self.decode,
      input_shape: self.input_shape,
      labels: self.labels,
    })
  }
}

/// 组合裁剪器、模型与后处理的检测器
pub struct Detector<M> {
  model: M,
  cropper: Option<QuadCropper>,
  decode: DecodeConfig,
  input_shape: InputShape,
  labels: LabelTable,
}

impl<M: Model> Detector<M> {
  pub fn builder() -> DetectorBuilder {
    DetectorBuilder::default()
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }

  pub fn model(&self) -> &M {
    &self.model
  }

  pub fn detect(&self, image: &RgbImage) -> Result<DetectionSet, DetectorError<M::Error>> {
    let now = std::time::Instant::now();

    let image = match &self.cropper {
      Some(cropper) => cropper.crop(image),
      None => std::borrow::Cow::Borrowed(image),
    };
    debug!("裁剪后图像尺寸: {}x{}", image.width(), image.height());

    let input = prepare_input(&image, &self.input_shape)?;
    let raw = self.model.infer(&input).map_err(DetectorError::ModelError)?;
    let elapsed = now.elapsed();
    debug!("推理完成，耗时: {:.2?}", elapsed);

    let result = decode(&raw, &self.decode, &self.labels)?;
    info!("检测到 {} 个物体，耗时: {:.2?}", result.len(), now.elapsed());
    Ok(result)
  }
}
