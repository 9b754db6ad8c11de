// 该文件是 Kibo Vision （希望号视觉） 项目的一部分。
// src/frame.rs - 模型输入帧
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

use image::{RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug, PartialEq)]
pub enum InputError {
  #[error("模型输入尺寸无效: {0}x{1}")]
  InvalidShape(u32, u32),
  #[error("源图像为空")]
  EmptyImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorType {
  UInt8,
  /// 像素值除以 255 归一化到 [0, 1]
  Float32,
}

/// 模型输入尺寸与数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
  pub width: u32,
  pub height: u32,
  pub tensor_type: TensorType,
}

impl InputShape {
  pub fn new(width: u32, height: u32, tensor_type: TensorType) -> Self {
    Self {
      width,
      height,
      tensor_type,
    }
  }

  pub fn len(&self) -> usize {
    RGB_CHANNELS * self.width as usize * self.height as usize
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl Default for InputShape {
  fn default() -> Self {
    // 参考模型的输入为 480x480 浮点
    Self::new(480, 480, TensorType::Float32)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputData {
  UInt8(Box<[u8]>),
  Float32(Box<[f32]>),
}

/// NHWC 排列的 RGB 输入帧
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
  width: u32,
  height: u32,
  data: InputData,
}

impl ModelInput {
  pub fn width(&self) -> usize {
    self.width as usize
  }

  pub fn height(&self) -> usize {
    self.height as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn tensor_type(&self) -> TensorType {
    match self.data {
      InputData::UInt8(_) => TensorType::UInt8,
      InputData::Float32(_) => TensorType::Float32,
    }
  }

  pub fn data(&self) -> &InputData {
    &self.data
  }

  pub fn as_u8(&self) -> Option<&[u8]> {
    match &self.data {
      InputData::UInt8(data) => Some(data),
      InputData::Float32(_) => None,
    }
  }

  pub fn as_f32(&self) -> Option<&[f32]> {
    match &self.data {
      InputData::Float32(data) => Some(data),
      InputData::UInt8(_) => None,
    }
  }
}

/// 缩放到模型输入尺寸并转换为 NHWC 张量
pub fn prepare_input(image: &RgbImage, shape: &InputShape) -> Result<ModelInput, InputError> {
  if shape.is_empty() {
    return Err(InputError::InvalidShape(shape.width, shape.height));
  }
  if image.width() == 0 || image.height() == 0 {
    return Err(InputError::EmptyImage);
  }

  debug!(
    "缩放图像 {}x{} -> {}x{}",
    image.width(),
    image.height(),
    shape.width,
    shape.height
  );
  let resized = image::imageops::resize(image, shape.width, shape.height, FilterType::Triangle);

  // RgbImage 的底层布局即为 NHWC
  let raw = resized.into_raw();
  let data = match shape.tensor_type {
    TensorType::UInt8 => InputData::UInt8(raw.into_boxed_slice()),
    TensorType::Float32 => InputData::Float32(raw.iter().map(|&v| v as f32 / 255.0).collect()),
  };

  Ok(ModelInput {
    width: shape.width,
    height: shape.height,
    data,
  })
}
