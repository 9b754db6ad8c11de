// 该文件是 Kibo Vision （希望号视觉） 项目的一部分。
// src/args.rs - 命令行参数
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

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use kibo_vision::{CropConfig, DecodeConfig};

/// Kibo Vision 检测后处理与四边形裁剪工具
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 解码原始检测张量（平台字节序 f32，[4 + C, N]）
  Decode(DecodeArgs),
  /// 裁剪图像中的四边形区域
  Crop(CropArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
  /// 名称, 置信度, 坐标
  Text,
  /// 类别索引, 置信度, 坐标
  Id,
  Json,
}

#[derive(Parser, Debug)]
pub struct DecodeArgs {
  /// 原始张量文件路径
  #[arg(long, value_name = "FILE")]
  pub tensor: PathBuf,

  /// 标签文件路径（每行一个标签）
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,

  /// 类别数量
  #[arg(long, default_value = "11", value_name = "COUNT")]
  pub num_classes: usize,

  /// 预测槽位数量
  #[arg(long, default_value = "4725", value_name = "COUNT")]
  pub num_slots: usize,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 输出格式
  #[arg(long, value_enum, default_value = "text")]
  pub format: OutputFormat,

  /// 结果写入文件，缺省时输出到标准输出
  #[arg(long, value_name = "FILE")]
  pub output: Option<PathBuf>,

  /// 在该图像上绘制检测框
  #[arg(long, value_name = "IMAGE", requires = "annotated")]
  pub image: Option<PathBuf>,

  /// 绘制结果保存路径
  #[arg(long, value_name = "IMAGE")]
  pub annotated: Option<PathBuf>,
}

impl DecodeArgs {
  pub fn decode_config(&self) -> DecodeConfig {
    DecodeConfig::new(self.num_classes, self.num_slots)
      .with_confidence_threshold(self.confidence)
      .with_iou_threshold(self.nms_threshold)
  }
}

#[derive(Parser, Debug)]
pub struct CropArgs {
  /// 输入图像路径
  #[arg(long, value_name = "IMAGE")]
  pub input: PathBuf,

  /// 输出图像路径
  #[arg(long, value_name = "IMAGE")]
  pub output: PathBuf,

  /// 使用最早版本的参数
  #[arg(long)]
  pub legacy: bool,

  /// 自适应阈值邻域大小（奇数）
  #[arg(long, value_name = "PIXELS")]
  pub block_size: Option<u32>,

  /// 自适应阈值偏置
  #[arg(long, value_name = "VALUE", allow_hyphen_values = true)]
  pub bias: Option<i32>,

  /// 白色掩码饱和度上限
  #[arg(long, value_name = "VALUE")]
  pub max_saturation: Option<u8>,

  /// 白色掩码亮度下限
  #[arg(long, value_name = "VALUE")]
  pub min_value: Option<u8>,

  /// 多边形近似系数
  #[arg(long, value_name = "FACTOR")]
  pub epsilon: Option<f64>,

  /// 是否要求凸四边形
  #[arg(long, value_name = "BOOL")]
  pub require_convex: Option<bool>,

  /// 外接矩形留白像素
  #[arg(long, value_name = "PIXELS")]
  pub padding: Option<u32>,

  /// 保留四边形以外的像素
  #[arg(long)]
  pub no_mask: bool,

  /// 在原图上标出裁剪区域并保存
  #[arg(long, value_name = "IMAGE")]
  pub show_region: Option<PathBuf>,
}

impl CropArgs {
  pub fn crop_config(&self) -> CropConfig {
    let mut config = if self.legacy {
      CropConfig::legacy()
    } else {
      CropConfig::default()
    };

    if let Some(block_size) = self.block_size {
      config.block_size = block_size;
    }
    if let Some(bias) = self.bias {
      config.bias = bias;
    }
    if let Some(saturation) = self.max_saturation {
      config.white_upper[1] = saturation;
    }
    if let Some(value) = self.min_value {
      config.white_lower[2] = value;
    }
    if let Some(epsilon) = self.epsilon {
      config.epsilon_factor = epsilon;
    }
    if let Some(require_convex) = self.require_convex {
      config.require_convex = require_convex;
    }
    if let Some(padding) = self.padding {
      config.padding = padding;
    }
    if self.no_mask {
      config.mask_outside_quad = false;
    }
    config
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn crop_overrides_apply_on_profile() {
    let args = Args::parse_from([
      "kibo-vision",
      "crop",
      "--input",
      "in.png",
      "--output",
      "out.png",
      "--legacy",
      "--padding",
      "5",
      "--require-convex",
      "true",
      "--no-mask",
    ]);
    let Command::Crop(crop) = args.command else {
      panic!("expected crop subcommand");
    };

    let config = crop.crop_config();
    assert_eq!(config.block_size, 11);
    assert_eq!(config.padding, 5);
    assert!(config.require_convex);
    assert!(!config.mask_outside_quad);
  }

  #[test]
  fn decode_defaults() {
    let args = Args::parse_from(["kibo-vision", "decode", "--tensor", "out.bin"]);
    let Command::Decode(decode) = args.command else {
      panic!("expected decode subcommand");
    };

    assert_eq!(decode.decode_config(), DecodeConfig::default());
    assert_eq!(decode.format, OutputFormat::Text);
  }
}
