// 该文件是 Kibo Vision （希望号视觉） 项目的一部分。
// src/crop/polygon.rs - 轮廓多边形几何
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

use imageproc::point::Point;

fn distance(a: Point<i32>, b: Point<i32>) -> f64 {
  ((a.x - b.x) as f64).hypot((a.y - b.y) as f64)
}

/// 点到线段 `a-b` 所在直线的距离；`a == b` 时退化为点距
fn line_distance(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
  let dx = (b.x - a.x) as f64;
  let dy = (b.y - a.y) as f64;
  let len = dx.hypot(dy);
  if len == 0.0 {
    return distance(p, a);
  }
  (dy * (p.x - a.x) as f64 - dx * (p.y - a.y) as f64).abs() / len
}

/// 对开放折线做 Douglas-Peucker 简化，返回保留标记；首尾总是保留
fn simplify_chain(chain: &[Point<i32>], epsilon: f64) -> Vec<bool> {
  let mut keep = vec![false; chain.len()];
  if chain.is_empty() {
    return keep;
  }
  keep[0] = true;
  keep[chain.len() - 1] = true;

  // 显式栈，长轮廓不会爆栈
  let mut stack = vec![(0, chain.len() - 1)];
  while let Some((start, end)) = stack.pop() {
    if end <= start + 1 {
      continue;
    }

    let mut max_index = start;
    let mut max_distance = 0.0;
    for i in (start + 1)..end {
      let d = line_distance(chain[i], chain[start], chain[end]);
      if d > max_distance {
        max_distance = d;
        max_index = i;
      }
    }

    if max_distance > epsilon {
      keep[max_index] = true;
      stack.push((start, max_index));
      stack.push((max_index, end));
    }
  }
  keep
}

fn farthest_from(points: &[Point<i32>], origin: Point<i32>) -> usize {
  let mut best = 0;
  let mut best_distance = -1.0;
  for (i, &p) in points.iter().enumerate() {
    let d = distance(p, origin);
    if d > best_distance {
      best_distance = d;
      best = i;
    }
  }
  best
}

/// 闭合轮廓的多边形近似
///
/// 以轮廓上相距最远的两个点为锚点把轮廓分成两条折线，分别做 Douglas-Peucker，
/// 这样近似结果不依赖轮廓的起点。相邻的重复顶点会被合并。
pub fn approximate_polygon(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
  let n = points.len();
  if n < 3 {
    return dedup_closed(points.to_vec());
  }

  let a = farthest_from(points, points[0]);
  let b = farthest_from(points, points[a]);

  let rotated: Vec<Point<i32>> = points[a..].iter().chain(points[..a].iter()).copied().collect();
  let split = (b + n - a) % n;
  if split == 0 {
    // 所有点重合
    return vec![rotated[0]];
  }

  let first = &rotated[..=split];
  let second: Vec<Point<i32>> = rotated[split..]
    .iter()
    .copied()
    .chain(std::iter::once(rotated[0]))
    .collect();

  let mut vertices = Vec::new();
  for chain in [first, second.as_slice()] {
    let keep = simplify_chain(chain, epsilon);
    // 每条折线的终点是另一条的起点，不重复加入
    for (&point, _) in chain.iter().zip(keep).take(chain.len() - 1).filter(|(_, k)| *k) {
      vertices.push(point);
    }
  }
  dedup_closed(vertices)
}

fn dedup_closed(mut points: Vec<Point<i32>>) -> Vec<Point<i32>> {
  points.dedup();
  while points.len() > 1 && points.first() == points.last() {
    points.pop();
  }
  points
}

/// 顶点转向一致即为凸多边形；共线顶点忽略，全部共线时不算凸
pub fn is_convex(points: &[Point<i32>]) -> bool {
  let n = points.len();
  if n < 3 {
    return false;
  }

  let mut orientation = 0i64;
  for i in 0..n {
    let p = points[i];
    let q = points[(i + 1) % n];
    let r = points[(i + 2) % n];
    let cross = (q.x - p.x) as i64 * (r.y - q.y) as i64 - (q.y - p.y) as i64 * (r.x - q.x) as i64;
    if cross == 0 {
      continue;
    }
    let sign = cross.signum();
    if orientation == 0 {
      orientation = sign;
    } else if orientation != sign {
      return false;
    }
  }
  orientation != 0
}

/// 顶点的外接矩形（包含端点）：`(min_x, min_y, max_x, max_y)`
pub fn bounding_box(points: &[Point<i32>]) -> Option<(i32, i32, i32, i32)> {
  let first = points.first()?;
  Some(points.iter().fold(
    (first.x, first.y, first.x, first.y),
    |(min_x, min_y, max_x, max_y), p| (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y)),
  ))
}
