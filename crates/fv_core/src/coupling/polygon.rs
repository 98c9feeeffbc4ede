// crates/fv_core/src/coupling/polygon.rs

//! 面多边形重叠
//!
//! 把两个面投影到源面的切平面，用 Sutherland-Hodgman 算法以源面为
//! 裁剪多边形求交，返回重叠面积。源面需为凸多边形。

use fv_foundation::Vector;
use glam::DVec2;

/// 裁剪判据容差
const EDGE_TOLERANCE: f64 = 1e-12;

/// 平面上的正交基，`e1 × e2 = normal`
#[derive(Debug, Clone, Copy)]
pub struct PlaneBasis {
    origin: Vector,
    e1: Vector,
    e2: Vector,
}

impl PlaneBasis {
    /// 以 `origin` 为原点、`normal` 为法向建立基；法向为零时返回 `None`
    pub fn new(origin: Vector, normal: Vector) -> Option<Self> {
        let n = normal.try_normalize()?;
        let helper = if n.x.abs() < 0.9 { Vector::X } else { Vector::Y };
        let e1 = (helper - n * n.dot(helper)).normalize();
        let e2 = n.cross(e1);
        Some(Self { origin, e1, e2 })
    }

    /// 投影到平面坐标
    #[inline]
    pub fn project(&self, p: Vector) -> DVec2 {
        let d = p - self.origin;
        DVec2::new(d.dot(self.e1), d.dot(self.e2))
    }
}

/// 有向面积（逆时针为正）
pub fn signed_area(points: &[DVec2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    0.5 * (0..n)
        .map(|i| points[i].perp_dot(points[(i + 1) % n]))
        .sum::<f64>()
}

/// 用凸多边形 `clip` 裁剪 `subject`
pub fn clip_convex(subject: &[DVec2], clip: &[DVec2]) -> Vec<DVec2> {
    if subject.len() < 3 || clip.len() < 3 {
        return Vec::new();
    }
    let mut clip = clip.to_vec();
    if signed_area(&clip) < 0.0 {
        clip.reverse();
    }

    let mut output = subject.to_vec();
    for i in 0..clip.len() {
        if output.is_empty() {
            break;
        }
        let a = clip[i];
        let b = clip[(i + 1) % clip.len()];
        let edge = b - a;
        let inside = |p: DVec2| edge.perp_dot(p - a) >= -EDGE_TOLERANCE * edge.length();

        let input = std::mem::take(&mut output);
        for j in 0..input.len() {
            let current = input[j];
            let previous = input[(j + input.len() - 1) % input.len()];
            let (cur_in, prev_in) = (inside(current), inside(previous));
            if cur_in != prev_in {
                if let Some(x) = line_intersection(previous, current, a, b) {
                    output.push(x);
                }
            }
            if cur_in {
                output.push(current);
            }
        }
    }
    output
}

/// 线段 p1-p2 与直线 a-b 的交点
fn line_intersection(p1: DVec2, p2: DVec2, a: DVec2, b: DVec2) -> Option<DVec2> {
    let d1 = p2 - p1;
    let d2 = b - a;
    let cross = d1.perp_dot(d2);
    if cross.abs() < f64::EPSILON * d1.length() * d2.length() {
        return None;
    }
    let t = (a - p1).perp_dot(d2) / cross;
    Some(p1 + d1 * t.clamp(0.0, 1.0))
}

/// 目标面投影到源面平面后与源面的重叠面积
pub fn overlap_area(src: &[Vector], src_normal: Vector, tgt: &[Vector]) -> f64 {
    let Some(origin) = src.first().copied() else {
        return 0.0;
    };
    let Some(basis) = PlaneBasis::new(origin, src_normal) else {
        return 0.0;
    };
    let src_2d: Vec<DVec2> = src.iter().map(|&p| basis.project(p)).collect();
    let tgt_2d: Vec<DVec2> = tgt.iter().map(|&p| basis.project(p)).collect();
    signed_area(&clip_convex(&tgt_2d, &src_2d)).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, s: f64) -> Vec<Vector> {
        vec![
            Vector::new(x0, y0, 0.0),
            Vector::new(x0 + s, y0, 0.0),
            Vector::new(x0 + s, y0 + s, 0.0),
            Vector::new(x0, y0 + s, 0.0),
        ]
    }

    #[test]
    fn test_overlap_of_shifted_squares() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(0.5, 0.25, 1.0);
        assert!((overlap_area(&a, Vector::Z, &b) - 0.375).abs() < 1e-12);
        // 目标面反向
        let mut rev = b.clone();
        rev.reverse();
        assert!((overlap_area(&a, Vector::Z, &rev) - 0.375).abs() < 1e-12);
    }

    #[test]
    fn test_disjoint_and_contained() {
        let a = square(0.0, 0.0, 1.0);
        assert!(overlap_area(&a, Vector::Z, &square(2.0, 0.0, 1.0)) < 1e-14);
        assert!((overlap_area(&a, Vector::Z, &square(0.25, 0.25, 0.5)) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_projection_ignores_normal_offset() {
        let a = square(0.0, 0.0, 1.0);
        let b: Vec<Vector> = square(0.0, 0.0, 1.0)
            .into_iter()
            .map(|p| p + Vector::new(0.0, 0.0, 0.3))
            .collect();
        assert!((overlap_area(&a, -Vector::Z, &b) - 1.0).abs() < 1e-12);
    }
}
