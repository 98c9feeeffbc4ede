// crates/fv_core/src/matrix/fv_matrix.rs

//! 有限体积矩阵
//!
//! LDU 形式：`diag`（每单元）、`upper`/`lower`（每内部面）。owner 行中
//! neighbour 列的系数为 `upper`，neighbour 行中 owner 列的系数为 `lower`。
//! 边界贡献按补丁保存为 `internal_coeffs`（加到对角）与
//! `boundary_coeffs`（非耦合补丁加到源项，耦合补丁乘以对侧单元值）。
//!
//! 方程为 `A ψ = source`。矩阵所代表的算子为 `A ψ − source`，
//! 因此显式源项 `Su` 以 `source −= Su·V` 加入，`== f` 以 `source += f·V` 加入。

use crate::config::SolutionControls;
use crate::fields::GeometricField;
use crate::fv_mesh::FvMesh;
use fv_foundation::dimension::DIM_VOLUME;
use fv_foundation::{DimensionSet, FieldValue, FvError, FvResult};
use std::sync::Arc;

/// 有限体积矩阵
#[derive(Debug, Clone)]
pub struct FvMatrix<T: FieldValue> {
    pub(crate) psi_name: String,
    pub(crate) mesh: Arc<FvMesh>,
    pub(crate) dimensions: DimensionSet,
    pub(crate) diag: Vec<f64>,
    pub(crate) upper: Vec<f64>,
    pub(crate) lower: Vec<f64>,
    pub(crate) source: Vec<T>,
    pub(crate) internal_coeffs: Vec<Vec<T>>,
    pub(crate) boundary_coeffs: Vec<Vec<T>>,
}

impl<T: FieldValue> FvMatrix<T> {
    /// 空矩阵；`dimensions` 为体积积分后的方程量纲
    pub fn new(psi: &GeometricField<T>, dimensions: DimensionSet) -> Self {
        let mesh = Arc::clone(psi.mesh());
        let n_cells = mesh.n_cells();
        let n_faces = mesh.n_internal_faces();
        let patch_sizes: Vec<usize> = psi.boundary_field().iter().map(|pf| pf.len()).collect();
        Self {
            psi_name: psi.name().to_string(),
            dimensions,
            diag: vec![0.0; n_cells],
            upper: vec![0.0; n_faces],
            lower: vec![0.0; n_faces],
            source: vec![T::zero(); n_cells],
            internal_coeffs: patch_sizes.iter().map(|&n| vec![T::zero(); n]).collect(),
            boundary_coeffs: patch_sizes.iter().map(|&n| vec![T::zero(); n]).collect(),
            mesh,
        }
    }

    // =========================================================================
    // 访问
    // =========================================================================

    #[inline]
    pub fn psi_name(&self) -> &str {
        &self.psi_name
    }

    #[inline]
    pub fn mesh(&self) -> &Arc<FvMesh> {
        &self.mesh
    }

    #[inline]
    pub fn dimensions(&self) -> DimensionSet {
        self.dimensions
    }

    #[inline]
    pub fn diag(&self) -> &[f64] {
        &self.diag
    }

    #[inline]
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    #[inline]
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    #[inline]
    pub fn source(&self) -> &[T] {
        &self.source
    }

    #[inline]
    pub fn internal_coeffs(&self) -> &[Vec<T>] {
        &self.internal_coeffs
    }

    #[inline]
    pub fn boundary_coeffs(&self) -> &[Vec<T>] {
        &self.boundary_coeffs
    }

    /// upper 与 lower 逐面相等
    pub fn is_symmetric(&self) -> bool {
        self.upper == self.lower
    }

    // =========================================================================
    // 检查
    // =========================================================================

    /// 检查另一矩阵属于同一场、同一网格、同一量纲
    pub fn check_compatible(&self, other: &FvMatrix<T>, op: &str) -> FvResult<()> {
        if self.psi_name != other.psi_name {
            return Err(FvError::field_mismatch(&self.psi_name, &other.psi_name));
        }
        FvError::check_mesh(&other.psi_name, self.mesh.id(), other.mesh.id())?;
        self.dimensions.check_same(&other.dimensions, op)
    }

    /// 检查 psi 与矩阵对应
    pub fn check_psi(&self, psi: &GeometricField<T>) -> FvResult<()> {
        if self.psi_name != psi.name() {
            return Err(FvError::field_mismatch(&self.psi_name, psi.name()));
        }
        FvError::check_mesh(psi.name(), self.mesh.id(), psi.mesh().id())
    }

    fn check_source_field(&self, field: &GeometricField<T>, op: &str) -> FvResult<()> {
        FvError::check_mesh(field.name(), self.mesh.id(), field.mesh().id())?;
        self.dimensions.check_same(&(field.dimensions() * DIM_VOLUME), op)
    }

    // =========================================================================
    // 代数
    // =========================================================================

    fn combine(&mut self, other: &FvMatrix<T>, sign: f64) {
        let pairs = [
            (&mut self.diag, &other.diag),
            (&mut self.upper, &other.upper),
            (&mut self.lower, &other.lower),
        ];
        for (a, b) in pairs {
            for (x, &y) in a.iter_mut().zip(b) {
                *x += sign * y;
            }
        }
        for (x, &y) in self.source.iter_mut().zip(&other.source) {
            *x += y * sign;
        }
        let patches = [
            (&mut self.internal_coeffs, &other.internal_coeffs),
            (&mut self.boundary_coeffs, &other.boundary_coeffs),
        ];
        for (a, b) in patches {
            for (pa, pb) in a.iter_mut().zip(b) {
                for (x, &y) in pa.iter_mut().zip(pb) {
                    *x += y * sign;
                }
            }
        }
    }

    pub fn add_assign(&mut self, other: &FvMatrix<T>) -> FvResult<()> {
        self.check_compatible(other, "+")?;
        self.combine(other, 1.0);
        Ok(())
    }

    pub fn sub_assign(&mut self, other: &FvMatrix<T>) -> FvResult<()> {
        self.check_compatible(other, "-")?;
        self.combine(other, -1.0);
        Ok(())
    }

    pub fn plus(mut self, other: &FvMatrix<T>) -> FvResult<Self> {
        self.add_assign(other)?;
        Ok(self)
    }

    pub fn minus(mut self, other: &FvMatrix<T>) -> FvResult<Self> {
        self.sub_assign(other)?;
        Ok(self)
    }

    /// 乘以无量纲常数
    pub fn scale(&mut self, factor: f64) {
        for x in self.diag.iter_mut().chain(&mut self.upper).chain(&mut self.lower) {
            *x *= factor;
        }
        for x in self
            .source
            .iter_mut()
            .chain(self.internal_coeffs.iter_mut().flatten())
            .chain(self.boundary_coeffs.iter_mut().flatten())
        {
            *x = *x * factor;
        }
    }

    pub fn negate(&mut self) {
        self.scale(-1.0);
    }

    /// `== field`：右端加入 field·V
    pub fn add_source(&mut self, field: &GeometricField<T>) -> FvResult<()> {
        self.check_source_field(field, "==")?;
        let volumes = self.mesh.volumes();
        for ((s, &f), &v) in self.source.iter_mut().zip(field.primitive_field()).zip(volumes) {
            *s += f * v;
        }
        Ok(())
    }

    /// 左端加入显式项 field，即右端减去 field·V
    pub fn add_explicit(&mut self, field: &GeometricField<T>) -> FvResult<()> {
        self.check_source_field(field, "+")?;
        let volumes = self.mesh.volumes();
        for ((s, &f), &v) in self.source.iter_mut().zip(field.primitive_field()).zip(volumes) {
            *s -= f * v;
        }
        Ok(())
    }

    // =========================================================================
    // 边界与约束
    // =========================================================================

    /// 组装完成后由各补丁场修改矩阵
    pub fn boundary_manipulate(&mut self, psi: &mut GeometricField<T>) -> FvResult<()> {
        self.check_psi(psi)?;
        let mesh = Arc::clone(&self.mesh);
        let internal = psi.primitive_field().to_vec();
        for pf in psi.boundary_field_mut() {
            pf.manipulate_matrix(self, &mesh, &internal)?;
        }
        Ok(())
    }

    /// 把单元 `cell` 固定为 `value`（用于纯 Neumann 问题）
    pub fn set_reference(&mut self, cell: usize, value: T) -> FvResult<()> {
        self.check_cell(cell)?;
        let d = self.diag[cell];
        self.source[cell] += value * d;
        self.diag[cell] += d;
        Ok(())
    }

    fn check_cell(&self, cell: usize) -> FvResult<()> {
        if cell < self.diag.len() {
            Ok(())
        } else {
            Err(FvError::invalid_entry(
                &self.psi_name,
                "cell",
                cell.to_string(),
                format!("单元编号超出范围 [0, {})", self.diag.len()),
            ))
        }
    }

    /// 把给定单元固定为给定值，相关耦合移到邻居的源项
    pub fn set_values(&mut self, cells: &[usize], values: &[T]) -> FvResult<()> {
        FvError::check_size(&format!("{} setValues", self.psi_name), cells.len(), values.len())?;
        let mut fixed: Vec<Option<T>> = vec![None; self.diag.len()];
        for (&cell, &value) in cells.iter().zip(values) {
            self.check_cell(cell)?;
            fixed[cell] = Some(value);
        }

        let owner = self.mesh.owner();
        let neighbour = self.mesh.neighbour();
        for face in 0..self.upper.len() {
            let (o, n) = (owner[face], neighbour[face]);
            if fixed[o].is_none() && fixed[n].is_none() {
                continue;
            }
            if let Some(v) = fixed[o] {
                self.source[n] -= v * self.lower[face];
            }
            if let Some(v) = fixed[n] {
                self.source[o] -= v * self.upper[face];
            }
            self.upper[face] = 0.0;
            self.lower[face] = 0.0;
        }

        for p in 0..self.internal_coeffs.len() {
            if self.internal_coeffs[p].is_empty() {
                continue;
            }
            for (i, &cell) in self.mesh.patch_face_cells(p).iter().enumerate() {
                if fixed[cell].is_some() {
                    self.internal_coeffs[p][i] = T::zero();
                    self.boundary_coeffs[p][i] = T::zero();
                }
            }
        }

        for (cell, value) in fixed.iter().enumerate() {
            if let Some(v) = value {
                self.source[cell] = *v * self.diag[cell];
            }
        }
        Ok(())
    }

    // =========================================================================
    // 松弛
    // =========================================================================

    /// 按对角占优算法松弛；alpha ≤ 0 时不做任何事
    pub fn relax(&mut self, psi: &GeometricField<T>, alpha: f64) -> FvResult<()> {
        self.check_psi(psi)?;
        if alpha <= 0.0 {
            return Ok(());
        }
        let d0 = self.diag.clone();
        let owner = self.mesh.owner();
        let neighbour = self.mesh.neighbour();

        let mut sum_off = vec![0.0; self.diag.len()];
        for face in 0..self.upper.len() {
            sum_off[owner[face]] += self.upper[face].abs();
            sum_off[neighbour[face]] += self.lower[face].abs();
        }

        let mut d = self.diag.clone();
        for (p, pf) in psi.boundary_field().iter().enumerate() {
            let cells = self.mesh.patch_face_cells(p);
            let ic = &self.internal_coeffs[p];
            if pf.is_coupled() {
                let bc = &self.boundary_coeffs[p];
                for i in 0..ic.len() {
                    d[cells[i]] += ic[i].component(0);
                    sum_off[cells[i]] += bc[i].component(0).abs();
                }
            } else {
                for i in 0..ic.len() {
                    d[cells[i]] += ic[i].cmpt_mag().cmpt_max();
                }
            }
        }

        for (di, &s) in d.iter_mut().zip(&sum_off) {
            *di = di.abs().max(s);
        }
        for di in &mut d {
            *di /= alpha;
        }

        for (p, pf) in psi.boundary_field().iter().enumerate() {
            let cells = self.mesh.patch_face_cells(p);
            let ic = &self.internal_coeffs[p];
            for i in 0..ic.len() {
                d[cells[i]] -= if pf.is_coupled() {
                    ic[i].component(0)
                } else {
                    ic[i].cmpt_min()
                };
            }
        }

        for (((s, &dn), &dold), &x) in self
            .source
            .iter_mut()
            .zip(&d)
            .zip(&d0)
            .zip(psi.primitive_field())
        {
            *s += x * (dn - dold);
        }
        self.diag = d;
        Ok(())
    }

    /// 按场覆盖值或控制文件中的方程松弛因子松弛
    pub fn relax_auto(&mut self, psi: &GeometricField<T>, controls: &SolutionControls) -> FvResult<()> {
        let factor = psi
            .relaxation_factor()
            .or_else(|| controls.equation_relaxation_factor(psi.name()));
        match factor {
            Some(alpha) => self.relax(psi, alpha),
            None => Ok(()),
        }
    }

    // =========================================================================
    // 派生量
    // =========================================================================

    /// 对角加上边界对角的分量平均
    pub fn d(&self) -> Vec<f64> {
        let mut d = self.diag.clone();
        for (p, ic) in self.internal_coeffs.iter().enumerate() {
            for (&cell, c) in self.mesh.patch_face_cells(p).iter().zip(ic) {
                d[cell] += cmpt_average(c);
            }
        }
        d
    }

    /// 中心系数 D/V
    pub fn a(&self) -> Vec<f64> {
        self.d()
            .iter()
            .zip(self.mesh.volumes())
            .map(|(&d, &v)| d / v)
            .collect()
    }

    /// 非对角部分作用于 psi 加源项，除以体积
    pub fn h(&self, psi: &GeometricField<T>) -> FvResult<Vec<T>> {
        self.check_psi(psi)?;
        let x = psi.primitive_field();
        let mut h = self.source.clone();

        // 边界对角中未计入 a() 的逐分量部分
        for (p, ic) in self.internal_coeffs.iter().enumerate() {
            for (&cell, c) in self.mesh.patch_face_cells(p).iter().zip(ic) {
                let avg = cmpt_average(c);
                let mut diff = T::zero();
                for k in 0..T::N_COMPONENTS {
                    diff.set_component(k, (avg - c.component(k)) * x[cell].component(k));
                }
                h[cell] += diff;
            }
        }

        self.add_off_diagonal(x, &mut h, -1.0);
        self.add_boundary_source(psi, &mut h)?;
        for (hi, &v) in h.iter_mut().zip(self.mesh.volumes()) {
            *hi = *hi * (1.0 / v);
        }
        Ok(h)
    }

    /// 单元残差 source − A ψ
    pub fn residual(&self, psi: &GeometricField<T>) -> FvResult<Vec<T>> {
        self.check_psi(psi)?;
        let x = psi.primitive_field();
        let mut r: Vec<T> = self
            .source
            .iter()
            .zip(&self.diag)
            .zip(x)
            .map(|((&s, &d), &xi)| s - xi * d)
            .collect();
        for (p, ic) in self.internal_coeffs.iter().enumerate() {
            for (&cell, c) in self.mesh.patch_face_cells(p).iter().zip(ic) {
                r[cell] -= c.cmpt_multiply(&x[cell]);
            }
        }
        self.add_off_diagonal(x, &mut r, -1.0);
        self.add_boundary_source(psi, &mut r)?;
        Ok(r)
    }

    /// y += sign · (非对角部分 · x)
    fn add_off_diagonal(&self, x: &[T], y: &mut [T], sign: f64) {
        let owner = self.mesh.owner();
        let neighbour = self.mesh.neighbour();
        for face in 0..self.upper.len() {
            let (o, n) = (owner[face], neighbour[face]);
            y[o] += x[n] * (sign * self.upper[face]);
            y[n] += x[o] * (sign * self.lower[face]);
        }
    }

    /// 边界源：非耦合补丁加 boundary_coeffs，耦合补丁加 boundary_coeffs·对侧值
    pub(crate) fn add_boundary_source(&self, psi: &GeometricField<T>, y: &mut [T]) -> FvResult<()> {
        let x = psi.primitive_field();
        for (p, pf) in psi.boundary_field().iter().enumerate() {
            let bc = &self.boundary_coeffs[p];
            if bc.is_empty() {
                continue;
            }
            let cells = self.mesh.patch_face_cells(p);
            if pf.is_coupled() {
                let nbr = pf.patch_neighbour_field(&self.mesh, x)?;
                for ((&cell, c), v) in cells.iter().zip(bc).zip(&nbr) {
                    y[cell] += c.cmpt_multiply(v);
                }
            } else {
                for (&cell, &c) in cells.iter().zip(bc) {
                    y[cell] += c;
                }
            }
        }
        Ok(())
    }
}

/// 分量平均
fn cmpt_average<T: FieldValue>(v: &T) -> f64 {
    (0..T::N_COMPONENTS).map(|k| v.component(k)).sum::<f64>() / T::N_COMPONENTS as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::patch_types;
    use fv_foundation::dimension::{DIMLESS, DIM_LENGTH};
    use fv_mesh::BoxMeshBuilder;

    fn setup() -> (Arc<FvMesh>, GeometricField<f64>) {
        let mesh = Arc::new(FvMesh::new(BoxMeshBuilder::new(4, 1, 1, 4.0, 1.0, 1.0).build().unwrap()).unwrap());
        let psi = GeometricField::new("psi", Arc::clone(&mesh), DIMLESS, &patch_types(&mesh, "zeroGradient")).unwrap();
        (mesh, psi)
    }

    fn sample(psi: &GeometricField<f64>) -> FvMatrix<f64> {
        let mut m = FvMatrix::new(psi, DIM_VOLUME);
        for (i, d) in m.diag.iter_mut().enumerate() {
            *d = 4.0 + i as f64;
        }
        for (f, (u, l)) in m.upper.iter_mut().zip(m.lower.iter_mut()).enumerate() {
            *u = -1.0 - f as f64;
            *l = -0.5;
        }
        for (i, s) in m.source.iter_mut().enumerate() {
            *s = i as f64 * 0.25;
        }
        m
    }

    #[test]
    fn test_add_then_subtract_restores() {
        let (_, psi) = setup();
        let a = sample(&psi);
        let mut b = sample(&psi);
        b.scale(0.3);
        let mut c = a.clone();
        c.add_assign(&b).unwrap();
        c.sub_assign(&b).unwrap();
        for (x, y) in c.diag.iter().zip(&a.diag) {
            assert!((x - y).abs() < 1e-14);
        }
        for (x, y) in c.source.iter().zip(&a.source) {
            assert!((x - y).abs() < 1e-14);
        }
    }

    #[test]
    fn test_incompatible_matrices() {
        let (mesh, psi) = setup();
        let a = sample(&psi);
        let other = GeometricField::<f64>::new("q", Arc::clone(&mesh), DIMLESS, &patch_types(&mesh, "zeroGradient")).unwrap();
        let b = FvMatrix::new(&other, DIM_VOLUME);
        assert!(matches!(a.clone().plus(&b), Err(FvError::FieldMismatch { .. })));
        let c = FvMatrix::new(&psi, DIM_LENGTH);
        assert!(matches!(a.plus(&c), Err(FvError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_relax_makes_diagonal_dominant() {
        let (_, psi) = setup();
        let mut m = sample(&psi);
        m.diag[0] = 0.1;
        m.relax(&psi, 0.5).unwrap();
        assert!((m.diag[0] - 2.0).abs() < 1e-12);
        let before = sample(&psi);
        let mut same = before.clone();
        same.relax(&psi, 0.0).unwrap();
        assert_eq!(same.diag, before.diag);
    }

    #[test]
    fn test_set_values_moves_coupling_to_source() {
        let (_, psi) = setup();
        let mut m = sample(&psi);
        m.set_values(&[1], &[2.0]).unwrap();
        assert_eq!(m.source[1], 2.0 * m.diag[1]);
        assert_eq!(m.upper[0], 0.0);
        assert_eq!(m.lower[1], 0.0);
        // 单元 0 的源项减去 upper[0]·2
        assert!((m.source[0] - (0.0 + 1.0 * 2.0)).abs() < 1e-14);
        assert!(m.set_values(&[7], &[1.0]).is_err());
    }

    #[test]
    fn test_residual_and_h_consistent() {
        let (_, mut psi) = setup();
        for (i, v) in psi.primitive_field_mut().iter_mut().enumerate() {
            *v = 1.0 + i as f64;
        }
        let m = sample(&psi);
        let r = m.residual(&psi).unwrap();
        let h = m.h(&psi).unwrap();
        let a = m.a();
        for c in 0..4 {
            let expected = (h[c] - a[c] * psi.primitive_field()[c]) * psi.mesh().volumes()[c];
            assert!((r[c] - expected).abs() < 1e-12);
        }
    }
}
