// crates/fv_mesh/src/generation.rs

//! 网格生成
//!
//! 提供简单的结构化网格生成工具，用于测试、验证与命令行演示：
//!
//! - [`BoxMeshBuilder`]: 长方体六面体网格，六个侧面可命名、可设为周期或空补丁
//! - [`unit_square_patch`]: z=0 平面上的单位正方形四边形面集合
//!
//! # 编号
//!
//! - 单元 `(i, j, k)` 的编号为 `i + nx*(j + ny*k)`
//! - 点 `(i, j, k)` 的编号为 `i + (nx+1)*(j + (ny+1)*k)`
//! - 同名的侧面合并为一个补丁，补丁按侧面 xmin, xmax, ymin, ymax, zmin, zmax
//!   中首次出现的顺序排列
//!
//! # 使用示例
//!
//! ```rust
//! use fv_mesh::generation::BoxMeshBuilder;
//!
//! let mesh = BoxMeshBuilder::new(4, 3, 2, 1.0, 1.0, 1.0).build().unwrap();
//! assert_eq!(mesh.n_cells(), 24);
//! assert_eq!(mesh.n_patches(), 6);
//! ```

use crate::patch::{PatchKind, PolyPatch};
use crate::poly_mesh::PolyMesh;
use crate::primitive_patch::PrimitivePatch;
use fv_foundation::{FvError, FvResult, Vector};

/// 长方体的六个侧面
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxSide {
    XMin = 0,
    XMax = 1,
    YMin = 2,
    YMax = 3,
    ZMin = 4,
    ZMax = 5,
}

impl BoxSide {
    /// 全部侧面
    pub const ALL: [BoxSide; 6] = [
        BoxSide::XMin,
        BoxSide::XMax,
        BoxSide::YMin,
        BoxSide::YMax,
        BoxSide::ZMin,
        BoxSide::ZMax,
    ];

    /// 默认补丁名
    pub fn default_name(&self) -> &'static str {
        ["xmin", "xmax", "ymin", "ymax", "zmin", "zmax"][*self as usize]
    }

    /// 对侧
    pub fn opposite(&self) -> BoxSide {
        BoxSide::ALL[(*self as usize) ^ 1]
    }
}

/// 长方体网格生成器
#[derive(Debug, Clone)]
pub struct BoxMeshBuilder {
    n: [usize; 3],
    lengths: Vector,
    origin: Vector,
    sides: [(String, PatchKind); 6],
}

impl BoxMeshBuilder {
    /// 创建生成器，各侧面默认为同名 `patch`
    pub fn new(nx: usize, ny: usize, nz: usize, lx: f64, ly: f64, lz: f64) -> Self {
        let sides = BoxSide::ALL.map(|s| (s.default_name().to_string(), PatchKind::Patch));
        Self {
            n: [nx, ny, nz],
            lengths: Vector::new(lx, ly, lz),
            origin: Vector::ZERO,
            sides,
        }
    }

    /// 立方体
    pub fn cube(n: usize, length: f64) -> Self {
        Self::new(n, n, n, length, length, length)
    }

    /// 设置原点
    pub fn with_origin(mut self, origin: Vector) -> Self {
        self.origin = origin;
        self
    }

    /// 设置侧面补丁的名称与类型；同名侧面合并
    pub fn with_patch(mut self, side: BoxSide, name: impl Into<String>, kind: PatchKind) -> Self {
        self.sides[side as usize] = (name.into(), kind);
        self
    }

    /// 把 `side` 与其对侧设为一对周期补丁
    pub fn with_cyclic(mut self, side: BoxSide) -> Self {
        let other = side.opposite();
        let (a, b) = (side.default_name(), other.default_name());
        self.sides[side as usize] = (
            a.to_string(),
            PatchKind::Cyclic {
                neighbour_patch: b.to_string(),
            },
        );
        self.sides[other as usize] = (
            b.to_string(),
            PatchKind::Cyclic {
                neighbour_patch: a.to_string(),
            },
        );
        self
    }

    /// 把 `side` 与其对侧合并为一个空补丁（二维算例）
    pub fn with_empty(self, side: BoxSide, name: impl Into<String>) -> Self {
        let name = name.into();
        let other = side.opposite();
        self.with_patch(side, name.clone(), PatchKind::Empty)
            .with_patch(other, name, PatchKind::Empty)
    }

    /// 单元数
    pub fn n_cells(&self) -> usize {
        self.n.iter().product()
    }

    /// 网格间距
    pub fn spacing(&self) -> Vector {
        self.lengths / Vector::new(self.n[0] as f64, self.n[1] as f64, self.n[2] as f64)
    }

    /// 构建网格
    pub fn build(&self) -> FvResult<PolyMesh> {
        let [nx, ny, nz] = self.n;
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(FvError::invalid_mesh(format!(
                "长方体网格的单元数必须为正: {} x {} x {}",
                nx, ny, nz
            )));
        }
        if self.lengths.min_element() <= 0.0 {
            return Err(FvError::invalid_mesh(format!(
                "长方体网格的边长必须为正: {:?}",
                self.lengths
            )));
        }

        let d = self.spacing();
        let pid = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);
        let cid = |i: usize, j: usize, k: usize| i + nx * (j + ny * k);

        let mut points = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
        for k in 0..=nz {
            for j in 0..=ny {
                for i in 0..=nx {
                    points.push(
                        self.origin
                            + Vector::new(i as f64 * d.x, j as f64 * d.y, k as f64 * d.z),
                    );
                }
            }
        }

        // 右手法则下朝向 +x/+y/+z 的面
        let x_face = |i, j, k| vec![pid(i, j, k), pid(i, j + 1, k), pid(i, j + 1, k + 1), pid(i, j, k + 1)];
        let y_face = |i, j, k| vec![pid(i, j, k), pid(i, j, k + 1), pid(i + 1, j, k + 1), pid(i + 1, j, k)];
        let z_face = |i, j, k| vec![pid(i, j, k), pid(i + 1, j, k), pid(i + 1, j + 1, k), pid(i, j + 1, k)];
        let flip = |mut f: Vec<usize>| {
            f.reverse();
            f
        };

        let mut faces = Vec::new();
        let mut owner = Vec::new();
        let mut neighbour = Vec::new();

        // 内部面：逐单元按 +x, +y, +z 的顺序，保证上三角排列
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let c = cid(i, j, k);
                    if i + 1 < nx {
                        faces.push(x_face(i + 1, j, k));
                        owner.push(c);
                        neighbour.push(cid(i + 1, j, k));
                    }
                    if j + 1 < ny {
                        faces.push(y_face(i, j + 1, k));
                        owner.push(c);
                        neighbour.push(cid(i, j + 1, k));
                    }
                    if k + 1 < nz {
                        faces.push(z_face(i, j, k + 1));
                        owner.push(c);
                        neighbour.push(cid(i, j, k + 1));
                    }
                }
            }
        }

        // 各侧面的边界面
        let mut side_faces: Vec<Vec<(Vec<usize>, usize)>> = vec![Vec::new(); 6];
        for k in 0..nz {
            for j in 0..ny {
                side_faces[0].push((flip(x_face(0, j, k)), cid(0, j, k)));
                side_faces[1].push((x_face(nx, j, k), cid(nx - 1, j, k)));
            }
        }
        for k in 0..nz {
            for i in 0..nx {
                side_faces[2].push((flip(y_face(i, 0, k)), cid(i, 0, k)));
                side_faces[3].push((y_face(i, ny, k), cid(i, ny - 1, k)));
            }
        }
        for j in 0..ny {
            for i in 0..nx {
                side_faces[4].push((flip(z_face(i, j, 0)), cid(i, j, 0)));
                side_faces[5].push((z_face(i, j, nz), cid(i, j, nz - 1)));
            }
        }

        // 同名侧面合并
        let mut patch_names: Vec<&str> = Vec::new();
        for (name, _) in &self.sides {
            if !patch_names.contains(&name.as_str()) {
                patch_names.push(name);
            }
        }
        let mut patches = Vec::with_capacity(patch_names.len());
        for name in patch_names {
            let start = faces.len();
            let mut kind = PatchKind::Patch;
            for (s, (side_name, side_kind)) in self.sides.iter().enumerate() {
                if side_name == name {
                    kind = side_kind.clone();
                    for (face, cell) in side_faces[s].drain(..) {
                        faces.push(face);
                        owner.push(cell);
                    }
                }
            }
            patches.push(PolyPatch::new(name, kind, start, faces.len() - start));
        }

        PolyMesh::new(points, faces, owner, neighbour, patches)
    }
}

/// z=0 平面上 `[0,1]x[0,1]` 的 nx×ny 四边形面集合，法向 +z，面编号 `i + nx*j`
pub fn unit_square_patch(nx: usize, ny: usize) -> PrimitivePatch {
    let mut points = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            points.push(Vector::new(i as f64 / nx as f64, j as f64 / ny as f64, 0.0));
        }
    }
    let pid = |i: usize, j: usize| i + (nx + 1) * j;
    let mut faces = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            faces.push(vec![pid(i, j), pid(i + 1, j), pid(i + 1, j + 1), pid(i, j + 1)]);
        }
    }
    PrimitivePatch::new(points, faces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_counts_and_volume() {
        let mesh = BoxMeshBuilder::new(3, 2, 4, 3.0, 1.0, 2.0).build().unwrap();
        assert_eq!(mesh.n_cells(), 24);
        // 内部面: (nx-1)ny nz + nx(ny-1)nz + nx ny(nz-1)
        assert_eq!(mesh.n_internal_faces(), 2 * 2 * 4 + 3 * 1 * 4 + 3 * 2 * 3);
        assert_eq!(mesh.n_boundary_faces(), 2 * (2 * 4 + 3 * 4 + 3 * 2));
        assert!((mesh.geometry().total_volume() - 6.0).abs() < 1e-12);
        for v in mesh.cell_volumes() {
            assert!((v - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn test_boundary_normals_point_outwards() {
        let mesh = BoxMeshBuilder::cube(2, 1.0).build().unwrap();
        let expected = [
            -Vector::X,
            Vector::X,
            -Vector::Y,
            Vector::Y,
            -Vector::Z,
            Vector::Z,
        ];
        for (p, n) in expected.iter().enumerate() {
            for a in mesh.patch_face_areas(p) {
                assert!((a.normalize() - *n).length() < 1e-12);
            }
        }
        // 封闭网格的面积矢量之和为零
        let mut sum = Vector::ZERO;
        for p in 0..mesh.n_patches() {
            sum += mesh.patch_face_areas(p).iter().sum::<Vector>();
        }
        assert!(sum.length() < 1e-12);
    }

    #[test]
    fn test_cyclic_and_empty() {
        let mesh = BoxMeshBuilder::new(4, 3, 1, 1.0, 1.0, 0.1)
            .with_cyclic(BoxSide::XMin)
            .with_empty(BoxSide::ZMin, "frontAndBack")
            .build()
            .unwrap();
        assert_eq!(mesh.n_patches(), 5);
        let left = mesh.patch_index("xmin").unwrap();
        let right = mesh.patch_index("xmax").unwrap();
        assert!(mesh.patch(left).kind().is_coupled());
        assert_eq!(mesh.patch(left).size(), mesh.patch(right).size());
        let fb = mesh.patch_index("frontAndBack").unwrap();
        assert_eq!(mesh.patch(fb).size(), 24);
        assert_eq!(mesh.patch(fb).kind(), &PatchKind::Empty);
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(BoxMeshBuilder::new(0, 1, 1, 1.0, 1.0, 1.0).build().is_err());
        assert!(BoxMeshBuilder::new(1, 1, 1, 1.0, -1.0, 1.0).build().is_err());
    }

    #[test]
    fn test_unit_square_patch() {
        let patch = unit_square_patch(5, 4);
        assert_eq!(patch.len(), 20);
        let area: f64 = patch.face_areas().iter().map(|a| a.z).sum();
        assert!((area - 1.0).abs() < 1e-12);
    }
}
