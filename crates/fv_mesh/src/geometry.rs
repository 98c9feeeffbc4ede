// crates/fv_mesh/src/geometry.rs

//! 多面体网格几何量
//!
//! - 面中心与面积矢量：以面点平均值为中心做三角剖分，按三角形面积加权
//! - 单元中心与体积：以面中心平均值为估计中心做棱锥分解
//!
//! 面积矢量方向由点的环绕顺序（右手法则）决定，对 owner 单元指向外侧。

use fv_foundation::value::{ROOT_VSMALL, VSMALL};
use fv_foundation::Vector;
use serde::{Deserialize, Serialize};

/// 网格几何量
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshGeometry {
    /// 面中心
    pub face_centres: Vec<Vector>,
    /// 面积矢量
    pub face_areas: Vec<Vector>,
    /// 面积大小
    pub mag_face_areas: Vec<f64>,
    /// 单元中心
    pub cell_centres: Vec<Vector>,
    /// 单元体积
    pub cell_volumes: Vec<f64>,
}

impl MeshGeometry {
    /// 计算全部几何量
    pub fn compute(
        points: &[Vector],
        faces: &[Vec<usize>],
        owner: &[usize],
        neighbour: &[usize],
        n_cells: usize,
    ) -> Self {
        let (face_centres, face_areas): (Vec<Vector>, Vec<Vector>) =
            faces.iter().map(|f| face_centre_and_area(points, f)).unzip();
        let mag_face_areas = face_areas.iter().map(|a| a.length()).collect();
        let (cell_centres, cell_volumes) =
            cell_centres_and_volumes(&face_centres, &face_areas, owner, neighbour, n_cells);
        Self {
            face_centres,
            face_areas,
            mag_face_areas,
            cell_centres,
            cell_volumes,
        }
    }

    /// 网格总体积
    pub fn total_volume(&self) -> f64 {
        self.cell_volumes.iter().sum()
    }
}

/// 单个面的中心与面积矢量
pub fn face_centre_and_area(points: &[Vector], face: &[usize]) -> (Vector, Vector) {
    let n = face.len();
    if n < 3 {
        let centre = if n == 0 {
            Vector::ZERO
        } else {
            face.iter().map(|&p| points[p]).sum::<Vector>() / n as f64
        };
        return (centre, Vector::ZERO);
    }
    if n == 3 {
        let (p0, p1, p2) = (points[face[0]], points[face[1]], points[face[2]]);
        return ((p0 + p1 + p2) / 3.0, 0.5 * (p1 - p0).cross(p2 - p0));
    }

    let estimate = face.iter().map(|&p| points[p]).sum::<Vector>() / n as f64;
    let mut sum_n = Vector::ZERO;
    let mut sum_a = 0.0;
    let mut sum_ac = Vector::ZERO;
    for i in 0..n {
        let p = points[face[i]];
        let next = points[face[(i + 1) % n]];
        let c = p + next + estimate;
        let tri_n = (next - p).cross(estimate - p);
        let a = tri_n.length();
        sum_n += tri_n;
        sum_a += a;
        sum_ac += a * c;
    }
    let centre = if sum_a < ROOT_VSMALL {
        estimate
    } else {
        sum_ac / (3.0 * sum_a)
    };
    (centre, 0.5 * sum_n)
}

/// 面点平均值
pub fn face_point_average(points: &[Vector], face: &[usize]) -> Vector {
    if face.is_empty() {
        return Vector::ZERO;
    }
    face.iter().map(|&p| points[p]).sum::<Vector>() / face.len() as f64
}

/// 单元中心与体积（棱锥分解）
pub fn cell_centres_and_volumes(
    face_centres: &[Vector],
    face_areas: &[Vector],
    owner: &[usize],
    neighbour: &[usize],
    n_cells: usize,
) -> (Vec<Vector>, Vec<f64>) {
    // 估计中心：面中心平均
    let mut estimate = vec![Vector::ZERO; n_cells];
    let mut n_cell_faces = vec![0usize; n_cells];
    for (face, &o) in owner.iter().enumerate() {
        estimate[o] += face_centres[face];
        n_cell_faces[o] += 1;
    }
    for (face, &n) in neighbour.iter().enumerate() {
        estimate[n] += face_centres[face];
        n_cell_faces[n] += 1;
    }
    for (e, &k) in estimate.iter_mut().zip(&n_cell_faces) {
        if k > 0 {
            *e /= k as f64;
        }
    }

    let mut centres = vec![Vector::ZERO; n_cells];
    let mut volumes = vec![0.0; n_cells];
    for (face, &o) in owner.iter().enumerate() {
        let pyr3_vol = face_areas[face].dot(face_centres[face] - estimate[o]);
        let pc = 0.75 * face_centres[face] + 0.25 * estimate[o];
        centres[o] += pyr3_vol * pc;
        volumes[o] += pyr3_vol;
    }
    for (face, &n) in neighbour.iter().enumerate() {
        let pyr3_vol = face_areas[face].dot(estimate[n] - face_centres[face]);
        let pc = 0.75 * face_centres[face] + 0.25 * estimate[n];
        centres[n] += pyr3_vol * pc;
        volumes[n] += pyr3_vol;
    }
    for cell in 0..n_cells {
        if volumes[cell].abs() > VSMALL {
            centres[cell] /= volumes[cell];
        } else {
            centres[cell] = estimate[cell];
        }
        volumes[cell] /= 3.0;
    }
    (centres, volumes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<Vector> {
        vec![
            Vector::new(0.0, 0.0, 0.0),
            Vector::new(1.0, 0.0, 0.0),
            Vector::new(1.0, 1.0, 0.0),
            Vector::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_quad_face() {
        let pts = unit_square();
        let (c, a) = face_centre_and_area(&pts, &[0, 1, 2, 3]);
        assert!((c - Vector::new(0.5, 0.5, 0.0)).length() < 1e-14);
        assert!((a - Vector::new(0.0, 0.0, 1.0)).length() < 1e-14);

        // 反向环绕，法向取反
        let (_, a) = face_centre_and_area(&pts, &[3, 2, 1, 0]);
        assert!((a + Vector::Z).length() < 1e-14);
    }

    #[test]
    fn test_triangle_face() {
        let pts = unit_square();
        let (c, a) = face_centre_and_area(&pts, &[0, 1, 3]);
        assert!((c - Vector::new(1.0 / 3.0, 1.0 / 3.0, 0.0)).length() < 1e-14);
        assert!((a.z - 0.5).abs() < 1e-14);
    }

    #[test]
    fn test_unit_cube_cell() {
        let mut pts = unit_square();
        pts.extend(unit_square().into_iter().map(|p| p + Vector::Z));
        // 六个面全部朝外
        let faces = vec![
            vec![0, 3, 2, 1],
            vec![4, 5, 6, 7],
            vec![0, 1, 5, 4],
            vec![2, 3, 7, 6],
            vec![0, 4, 7, 3],
            vec![1, 2, 6, 5],
        ];
        let owner = vec![0; 6];
        let geo = MeshGeometry::compute(&pts, &faces, &owner, &[], 1);
        assert!((geo.cell_volumes[0] - 1.0).abs() < 1e-12);
        assert!((geo.cell_centres[0] - Vector::splat(0.5)).length() < 1e-12);
        assert!((geo.total_volume() - 1.0).abs() < 1e-12);
    }
}
