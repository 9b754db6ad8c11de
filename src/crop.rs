// 该文件是 Kibo Vision （希望号视觉） 项目的一部分。
// src/crop.rs - 四边形区域裁剪
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

use std::{
  borrow::Cow,
  panic::{AssertUnwindSafe, catch_unwind},
};

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::{
  contours::{BorderType, find_contours},
  drawing::draw_polygon_mut,
  geometry::{arc_length, contour_area},
  point::Point,
};
use thiserror::Error;
use tracing::{debug, warn};

pub mod binarize;
pub mod polygon;

use self::{
  binarize::{adaptive_threshold, bitwise_and, white_mask},
  polygon::{approximate_polygon, bounding_box, is_convex},
};

#[derive(Error, Debug, PartialEq)]
pub enum CropError {
  #[error("裁剪配置无效: {0}")]
  InvalidConfig(String),
  #[error("输入图像为空")]
  EmptyImage,
  #[error("轮廓处理异常: {0}")]
  Internal(String),
}

/// 裁剪参数
///
/// `Default` 为较新版本的取值；`legacy()` 为最早版本的取值。
#[derive(Debug, Clone, PartialEq)]
pub struct CropConfig {
  /// 自适应阈值的邻域大小，必须为不小于 3 的奇数
  pub block_size: u32,
  /// 自适应阈值偏置
  pub bias: i32,
  /// HSV 白色掩码下界 (H, S, V)
  pub white_lower: [u8; 3],
  /// HSV 白色掩码上界 (H, S, V)
  pub white_upper: [u8; 3],
  /// 多边形近似精度 = 系数 x 轮廓周长
  pub epsilon_factor: f64,
  /// 按面积排序后最多检查的轮廓数
  pub max_candidates: usize,
  pub require_convex: bool,
  /// 外接矩形四周的留白像素
  pub padding: u32,
  /// 把四边形以外的像素涂黑
  pub mask_outside_quad: bool,
}

impl Default for CropConfig {
  fn default() -> Self {
    Self {
      block_size: 15,
      bias: 5,
      white_lower: [0, 0, 150],
      white_upper: [180, 40, 255],
      epsilon_factor: 0.02,
      max_candidates: 10,
      require_convex: true,
      padding: 10,
      mask_outside_quad: true,
    }
  }
}

impl CropConfig {
  pub fn legacy() -> Self {
    Self {
      block_size: 11,
      bias: 2,
      white_lower: [0, 0, 160],
      white_upper: [180, 30, 255],
      epsilon_factor: 0.01,
      max_candidates: 10,
      require_convex: false,
      padding: 0,
      mask_outside_quad: true,
    }
  }

  pub fn with_threshold(mut self, block_size: u32, bias: i32) -> Self {
    self.block_size = block_size;
    self.bias = bias;
    self
  }

  pub fn with_white_bounds(mut self, lower: [u8; 3], upper: [u8; 3]) -> Self {
    self.white_lower = lower;
    self.white_upper = upper;
    self
  }

  pub fn with_epsilon_factor(mut self, factor: f64) -> Self {
    self.epsilon_factor = factor;
    self
  }

  pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
    self.max_candidates = max_candidates;
    self
  }

  pub fn with_require_convex(mut self, require_convex: bool) -> Self {
    self.require_convex = require_convex;
    self
  }

  pub fn with_padding(mut self, padding: u32) -> Self {
    self.padding = padding;
    self
  }

  pub fn with_mask_outside_quad(mut self, mask: bool) -> Self {
    self.mask_outside_quad = mask;
    self
  }

  pub fn validate(&self) -> Result<(), CropError> {
    if self.block_size < 3 || self.block_size % 2 == 0 {
      return Err(CropError::InvalidConfig(format!(
        "邻域大小 {} 必须是不小于 3 的奇数",
        self.block_size
      )));
    }
    if !(self.epsilon_factor > 0.0 && self.epsilon_factor < 1.0) {
      return Err(CropError::InvalidConfig(format!(
        "近似系数 {} 必须在 (0, 1) 内",
        self.epsilon_factor
      )));
    }
    if self.max_candidates == 0 {
      return Err(CropError::InvalidConfig("候选轮廓数必须大于 0".to_string()));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quad {
  pub points: [Point<i32>; 4],
}

/// 选中的四边形及其留白、夹紧后的外接矩形
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
  pub quad: Quad,
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

impl CropRegion {
  /// 外接矩形加留白后夹紧到图像范围，退化时返回 None
  fn from_quad(quad: Quad, padding: u32, image_width: u32, image_height: u32) -> Option<Self> {
    let (min_x, min_y, max_x, max_y) = bounding_box(&quad.points)?;
    let padding = padding as i64;

    let x0 = (min_x as i64 - padding).max(0);
    let y0 = (min_y as i64 - padding).max(0);
    let x1 = (max_x as i64 + 1 + padding).min(image_width as i64);
    let y1 = (max_y as i64 + 1 + padding).min(image_height as i64);

    if x1 <= x0 || y1 <= y0 {
      return None;
    }

    Some(Self {
      quad,
      x: x0 as u32,
      y: y0 as u32,
      width: (x1 - x0) as u32,
      height: (y1 - y0) as u32,
    })
  }
}

/// 四周补一圈 1 像素的背景，贴着图像边缘的区域也能得到外轮廓
fn with_border(mask: &GrayImage) -> GrayImage {
  let mut bordered = GrayImage::new(mask.width() + 2, mask.height() + 2);
  image::imageops::replace(&mut bordered, mask, 1, 1);
  bordered
}

/// 在图像中寻找最可能的四边形区域（屏幕、标牌等）并裁剪
#[derive(Debug, Clone, Default)]
pub struct QuadCropper {
  config: CropConfig,
}

impl QuadCropper {
  pub fn new(config: CropConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &CropConfig {
    &self.config
  }

  pub fn find_quad(&self, image: &RgbImage) -> Result<Option<CropRegion>, CropError> {
    let config = &self.config;
    config.validate()?;

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
      return Err(CropError::EmptyImage);
    }

    let gray = image::imageops::grayscale(image);
    let thresh = adaptive_threshold(&gray, config.block_size, config.bias);
    let mask = white_mask(image, config.white_lower, config.white_upper);
    let edged = bitwise_and(&thresh, &mask);

    // 只保留最外层轮廓；坐标减去留边回到原图
    let mut contours: Vec<(f64, Vec<Point<i32>>)> = find_contours::<i32>(&with_border(&edged))
      .into_iter()
      .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
      .map(|c| {
        let points: Vec<Point<i32>> = c.points.iter().map(|p| Point::new(p.x - 1, p.y - 1)).collect();
        (contour_area(&points), points)
      })
      .collect();

    if contours.is_empty() {
      debug!("没有找到轮廓");
      return Ok(None);
    }
    debug!("找到 {} 个外轮廓", contours.len());

    contours.sort_by(|a, b| b.0.total_cmp(&a.0));

    for (index, (area, points)) in contours.iter().take(config.max_candidates).enumerate() {
      let epsilon = config.epsilon_factor * arc_length(points, true);
      let approx = approximate_polygon(points, epsilon);
      debug!(
        "候选轮廓 {}: 面积 {:.1}, 点数 {}, 近似顶点数 {}",
        index,
        area,
        points.len(),
        approx.len()
      );

      if approx.len() != 4 {
        continue;
      }
      if config.require_convex && !is_convex(&approx) {
        debug!("候选轮廓 {} 不是凸四边形，跳过", index);
        continue;
      }

      let quad = Quad {
        points: [approx[0], approx[1], approx[2], approx[3]],
      };
      let region = CropRegion::from_quad(quad, config.padding, width, height);
      if region.is_none() {
        warn!("四边形 {:?} 的外接矩形无效", quad.points);
      }
      return Ok(region);
    }

    debug!("没有找到四边形轮廓");
    Ok(None)
  }

  fn try_crop(&self, image: &RgbImage) -> Result<Option<RgbImage>, CropError> {
    let Some(region) = self.find_quad(image)? else {
      return Ok(None);
    };

    let mut cropped =
      image::imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image();

    if self.config.mask_outside_quad {
      let local = region
        .quad
        .points
        .map(|p| Point::new(p.x - region.x as i32, p.y - region.y as i32));
      let mut inside = GrayImage::new(region.width, region.height);
      draw_polygon_mut(&mut inside, &local, Luma([255u8]));

      for (x, y, pixel) in cropped.enumerate_pixels_mut() {
        if inside.get_pixel(x, y)[0] == 0 {
          *pixel = Rgb([0, 0, 0]);
        }
      }
    }

    debug!(
      "裁剪区域: ({}, {}) {}x{}",
      region.x, region.y, region.width, region.height
    );
    Ok(Some(cropped))
  }

  /// 裁剪到检测到的四边形；找不到或处理出错时原样返回输入图像
  pub fn crop<'a>(&self, image: &'a RgbImage) -> Cow<'a, RgbImage> {
    let outcome = catch_unwind(AssertUnwindSafe(|| self.try_crop(image))).unwrap_or_else(|panic| {
      let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
      Err(CropError::Internal(message))
    });

    match outcome {
      Ok(Some(cropped)) => {
        debug!(
          "裁剪完成: {}x{} -> {}x{}",
          image.width(),
          image.height(),
          cropped.width(),
          cropped.height()
        );
        Cow::Owned(cropped)
      }
      Ok(None) => Cow::Borrowed(image),
      Err(e) => {
        warn!("裁剪失败，返回原图: {}", e);
        Cow::Borrowed(image)
      }
    }
  }
}

pub fn crop_to_quad<'a>(image: &'a RgbImage, config: &CropConfig) -> Cow<'a, RgbImage> {
  QuadCropper::new(config.clone()).crop(image)
}
