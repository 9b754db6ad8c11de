// 该文件是 Kibo Vision （希望号视觉） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use image::ImageReader;
use tracing::{info, warn};

use args::{Args, Command, CropArgs, DecodeArgs, OutputFormat};
use kibo_vision::{
  LabelTable, QuadCropper, RawTensor, decode,
  output::{Draw, Record, to_json},
};

fn run_decode(args: &DecodeArgs) -> Result<()> {
  let config = args.decode_config();
  info!(
    "张量文件: {}, 类别数量: {}, 槽位数量: {}",
    args.tensor.display(),
    config.num_classes,
    config.num_slots
  );
  info!("置信度阈值: {}", config.confidence_threshold);
  info!("NMS 阈值: {}", config.iou_threshold);

  let labels = match &args.labels {
    Some(path) => LabelTable::load(path)?,
    None => {
      warn!("未指定标签文件，使用占位标签");
      LabelTable::default()
    }
  };

  let bytes = std::fs::read(&args.tensor)
    .with_context(|| format!("无法读取张量文件: {}", args.tensor.display()))?;
  let tensor = RawTensor::from_ne_bytes(&bytes)?;

  let now = std::time::Instant::now();
  let result = decode(tensor.as_slice(), &config, &labels)?;
  info!("解码完成，检测到 {} 个物体，耗时: {:.2?}", result.len(), now.elapsed());

  let text = match args.format {
    OutputFormat::Text => Record::default().render(&result),
    OutputFormat::Id => Record {
      label_with_name: false,
    }
    .render(&result),
    OutputFormat::Json => serde_json::to_string_pretty(&to_json(&result))?,
  };

  match &args.output {
    Some(path) => {
      std::fs::write(path, text).with_context(|| format!("无法写入结果: {}", path.display()))?;
      info!("结果已保存到: {}", path.display());
    }
    None => println!("{}", text),
  }

  if let (Some(image_path), Some(annotated)) = (&args.image, &args.annotated) {
    let mut image = ImageReader::open(image_path)?.decode()?.to_rgb8();
    Draw::default().draw_detections(&mut image, &result);
    image
      .save(annotated)
      .with_context(|| format!("无法保存图像: {}", annotated.display()))?;
    info!("检测框图像已保存到: {}", annotated.display());
  }

  Ok(())
}

fn run_crop(args: &CropArgs) -> Result<()> {
  let config = args.crop_config();
  info!("输入图像: {}", args.input.display());
  info!("裁剪参数: {:?}", config);

  let image = ImageReader::open(&args.input)
    .with_context(|| format!("无法打开图像: {}", args.input.display()))?
    .decode()?
    .to_rgb8();

  let cropper = QuadCropper::new(config);

  if let Some(path) = &args.show_region {
    match cropper.find_quad(&image) {
      Ok(Some(region)) => {
        let mut marked = image.clone();
        Draw::default().draw_region(&mut marked, &region);
        marked.save(path)?;
        info!("裁剪区域图像已保存到: {}", path.display());
      }
      Ok(None) => warn!("没有找到四边形区域，不生成区域图像"),
      Err(e) => warn!("查找四边形失败: {}", e),
    }
  }

  let now = std::time::Instant::now();
  let cropped = cropper.crop(&image);
  info!(
    "裁剪完成: {}x{} -> {}x{}，耗时: {:.2?}",
    image.width(),
    image.height(),
    cropped.width(),
    cropped.height(),
    now.elapsed()
  );

  cropped
    .save(&args.output)
    .with_context(|| format!("无法保存图像: {}", args.output.display()))?;
  info!("输出已保存到: {}", args.output.display());
  Ok(())
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  match &args.command {
    Command::Decode(decode_args) => run_decode(decode_args),
    Command::Crop(crop_args) => run_crop(crop_args),
  }
}
