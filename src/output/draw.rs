// 该文件是 Kibo Vision （希望号视觉） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::{crop::CropRegion, model::DetectionSet};

const BOX_THICKNESS: u32 = 2;
const BOX_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const REGION_COLOR: [u8; 3] = [0, 255, 0]; // 绿色

pub struct Draw {
  thickness: u32,
  box_color: [u8; 3],
  region_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      thickness: BOX_THICKNESS,
      box_color: BOX_COLOR,
      region_color: REGION_COLOR,
    }
  }
}

impl Draw {
  pub fn with_thickness(mut self, thickness: u32) -> Self {
    self.thickness = thickness.max(1);
    self
  }

  pub fn with_box_color(mut self, color: [u8; 3]) -> Self {
    self.box_color = color;
    self
  }

  pub fn with_region_color(mut self, color: [u8; 3]) -> Self {
    self.region_color = color;
    self
  }

  // 像素坐标的矩形边框，由外向内加粗
  fn draw_rect(&self, image: &mut RgbImage, x_min: i32, y_min: i32, x_max: i32, y_max: i32, color: [u8; 3]) {
    for t in 0..self.thickness as i32 {
      let (x0, y0, x1, y1) = (x_min + t, y_min + t, x_max - t, y_max - t);
      if x0 >= x1 || y0 >= y1 {
        break;
      }
      let rect = Rect::at(x0, y0).of_size((x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32);
      draw_hollow_rect_mut(image, rect, Rgb(color));
    }
  }

  /// bbox 为归一化坐标 [x_min, y_min, x_max, y_max]
  fn draw_bbox(&self, image: &mut RgbImage, bbox: [f32; 4], color: [u8; 3]) {
    let (w, h) = (image.width() as f32, image.height() as f32);
    if w < 1.0 || h < 1.0 {
      return;
    }

    let x_min = ((bbox[0] * w).floor() as i32).clamp(0, w as i32 - 1);
    let y_min = ((bbox[1] * h).floor() as i32).clamp(0, h as i32 - 1);
    let x_max = ((bbox[2] * w).ceil() as i32).clamp(0, w as i32 - 1);
    let y_max = ((bbox[3] * h).ceil() as i32).clamp(0, h as i32 - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }
    self.draw_rect(image, x_min, y_min, x_max, y_max, color);
  }

  pub fn draw_detections(&self, image: &mut RgbImage, result: &DetectionSet) {
    for item in result {
      self.draw_bbox(image, item.bbox(), self.box_color);
    }
  }

  /// 标出裁剪区域的外接矩形
  pub fn draw_region(&self, image: &mut RgbImage, region: &CropRegion) {
    if region.width < 2 || region.height < 2 {
      return;
    }
    let (x0, y0) = (region.x as i32, region.y as i32);
    let x1 = x0 + region.width as i32 - 1;
    let y1 = y0 + region.height as i32 - 1;
    self.draw_rect(image, x0, y0, x1, y1, self.region_color);
  }
}
