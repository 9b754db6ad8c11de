// 该文件是 Kibo Vision （希望号视觉） 项目的一部分。
// src/crop/binarize.rs - 自适应阈值与白色掩码
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

use image::{GrayImage, Luma, RgbImage};
use imageproc::filter::gaussian_blur_f32;

const FOREGROUND: u8 = 255;
const BACKGROUND: u8 = 0;

/// 与 OpenCV 相同的由窗口大小推导高斯 sigma 的公式
pub fn block_sigma(block_size: u32) -> f32 {
  0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// 高斯加权的自适应阈值：像素大于 `局部均值 - bias` 时为前景
pub fn adaptive_threshold(gray: &GrayImage, block_size: u32, bias: i32) -> GrayImage {
  let local_mean = gaussian_blur_f32(gray, block_sigma(block_size));

  let mut out = GrayImage::new(gray.width(), gray.height());
  for (x, y, pixel) in out.enumerate_pixels_mut() {
    let value = gray.get_pixel(x, y)[0] as i32;
    let threshold = local_mean.get_pixel(x, y)[0] as i32 - bias;
    *pixel = Luma([if value > threshold { FOREGROUND } else { BACKGROUND }]);
  }
  out
}

/// RGB 转 HSV，采用 8 位约定：H ∈ [0, 180)，S、V ∈ [0, 255]
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
  let (r, g, b) = (r as f32, g as f32, b as f32);
  let v = r.max(g).max(b);
  let diff = v - r.min(g).min(b);

  let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };

  let h = if diff == 0.0 {
    0.0
  } else if v == r {
    60.0 * (g - b) / diff
  } else if v == g {
    120.0 + 60.0 * (b - r) / diff
  } else {
    240.0 + 60.0 * (r - g) / diff
  };
  let h = if h < 0.0 { h + 360.0 } else { h };

  // 360° 取半后 179.5 以上会四舍五入到 180，回绕到 0
  let h = ((h / 2.0).round() as u32 % 180) as u8;
  [h, s.round() as u8, v as u8]
}

/// 选出 HSV 三通道都落在 `[lower, upper]`（闭区间）内的像素
pub fn white_mask(image: &RgbImage, lower: [u8; 3], upper: [u8; 3]) -> GrayImage {
  let mut out = GrayImage::new(image.width(), image.height());
  for (x, y, pixel) in out.enumerate_pixels_mut() {
    let hsv = rgb_to_hsv(image.get_pixel(x, y).0);
    let inside = (0..3).all(|c| lower[c] <= hsv[c] && hsv[c] <= upper[c]);
    *pixel = Luma([if inside { FOREGROUND } else { BACKGROUND }]);
  }
  out
}

pub fn bitwise_and(a: &GrayImage, b: &GrayImage) -> GrayImage {
  GrayImage::from_fn(a.width(), a.height(), |x, y| {
    Luma([a.get_pixel(x, y)[0] & b.get_pixel(x, y)[0]])
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn sigma_matches_block_size() {
    assert!((block_sigma(11) - 2.0).abs() < 1e-6);
    assert!((block_sigma(15) - 2.6).abs() < 1e-6);
    assert!((block_sigma(3) - 0.8).abs() < 1e-6);
  }

  #[test]
  fn hsv_of_primary_colors() {
    assert_eq!(rgb_to_hsv([255, 255, 255]), [0, 0, 255]);
    assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
    assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
    assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
    assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
    assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
  }

  #[test]
  fn white_mask_selects_bright_unsaturated() {
    let mut image = RgbImage::new(3, 1);
    image.put_pixel(0, 0, Rgb([240, 240, 235]));
    image.put_pixel(1, 0, Rgb([200, 30, 30]));
    image.put_pixel(2, 0, Rgb([60, 60, 60]));

    let mask = white_mask(&image, [0, 0, 150], [180, 40, 255]);
    assert_eq!(mask.as_raw(), &vec![255, 0, 0]);
  }

  #[test]
  fn uniform_image_passes_threshold() {
    let gray = GrayImage::from_pixel(20, 20, Luma([90]));
    let out = adaptive_threshold(&gray, 11, 2);
    assert!(out.pixels().all(|p| p[0] == FOREGROUND));
  }

  #[test]
  fn dark_side_of_an_edge_is_background() {
    let gray = GrayImage::from_fn(20, 10, |x, _| Luma([if x < 10 { 0 } else { 255 }]));
    let out = adaptive_threshold(&gray, 11, 2);
    assert_eq!(out.get_pixel(9, 5)[0], BACKGROUND);
    assert_eq!(out.get_pixel(10, 5)[0], FOREGROUND);
  }

  #[test]
  fn and_combines_masks() {
    let a = GrayImage::from_raw(2, 1, vec![255, 255]).expect("buffer");
    let b = GrayImage::from_raw(2, 1, vec![0, 255]).expect("buffer");
    assert_eq!(bitwise_and(&a, &b).as_raw(), &vec![0, 255]);
  }
}
