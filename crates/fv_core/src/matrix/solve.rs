// crates/fv_core/src/matrix/solve.rs

//! 分量分离求解
//!
//! 每个分量组装一个 CSR 矩阵：对角加上边界对角的该分量，内部面给出
//! 非对角元，cyclic 补丁的 `boundary_coeffs` 取负后作为与对侧单元的耦合。
//! 非耦合补丁的 `boundary_coeffs` 加到右端。
//!
//! 残差按归一化 L1 范数报告：
//! `Σ|b − Aψ| / (Σ(|Aψ − Aψ̄| + |b − Aψ̄|) + 1e-20)`，ψ̄ 为平均值。

use super::fv_matrix::FvMatrix;
use crate::config::{SolutionControls, SolverSettings};
use crate::fields::GeometricField;
use crate::linear_algebra::{create_preconditioner, create_solver, CsrMatrix, CsrPattern, SolverConfig};
use fv_foundation::{FieldValue, FvError, FvResult};
use std::fmt;

/// 防止归一化因子为零
const NORM_FACTOR_FLOOR: f64 = 1e-20;

/// 判断对称性的容差
const SYMMETRY_TOL: f64 = 1e-12;

/// 单个分量的求解结果
#[derive(Debug, Clone, PartialEq)]
pub struct SolverPerformance {
    pub solver_name: String,
    pub field_name: String,
    pub component: usize,
    pub initial_residual: f64,
    pub final_residual: f64,
    pub n_iterations: usize,
    pub converged: bool,
}

impl fmt::Display for SolverPerformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: Solving for {}[{}], Initial residual = {:e}, Final residual = {:e}, No Iterations {}",
            self.solver_name,
            self.field_name,
            self.component,
            self.initial_residual,
            self.final_residual,
            self.n_iterations
        )
    }
}

/// 某一分量的线性系统
struct ComponentSystem {
    matrix: CsrMatrix,
    rhs: Vec<f64>,
}

impl<T: FieldValue> FvMatrix<T> {
    /// 求解并更新 psi 的单元值与边界
    ///
    /// 求解器设置按 `psi.select(final)` 查找。
    pub fn solve(
        &self,
        psi: &mut GeometricField<T>,
        controls: &SolutionControls,
    ) -> FvResult<Vec<SolverPerformance>> {
        self.check_psi(psi)?;
        let settings = controls.solver_settings(&psi.select(controls.final_iteration()));
        self.solve_with(psi, &settings)
    }

    /// 按给定设置求解
    pub fn solve_with(
        &self,
        psi: &mut GeometricField<T>,
        settings: &SolverSettings,
    ) -> FvResult<Vec<SolverPerformance>> {
        self.check_psi(psi)?;
        let pattern = self.pattern(psi);
        let mut performances = Vec::with_capacity(T::N_COMPONENTS);
        let mut solution: Vec<T> = psi.primitive_field().to_vec();

        for cmpt in 0..T::N_COMPONENTS {
            let system = self.component_system(psi, cmpt, pattern.clone());
            let mut x: Vec<f64> = solution.iter().map(|v| v.component(cmpt)).collect();
            let perf = solve_component(&system, &mut x, settings, psi.name(), cmpt)?;
            for (v, &xi) in solution.iter_mut().zip(&x) {
                v.set_component(cmpt, xi);
            }
            tracing::info!("{perf}");
            performances.push(perf);
        }

        psi.primitive_field_mut().copy_from_slice(&solution);
        psi.correct_boundary_conditions()?;
        Ok(performances)
    }

    /// 稀疏模式：内部面与 cyclic 面对
    fn pattern(&self, psi: &GeometricField<T>) -> CsrPattern {
        let owner = self.mesh.owner();
        let neighbour = self.mesh.neighbour();
        let mut pairs: Vec<(usize, usize)> = (0..self.upper.len()).map(|f| (owner[f], neighbour[f])).collect();
        for (p, pf) in psi.boundary_field().iter().enumerate() {
            if !pf.is_coupled() {
                continue;
            }
            if let Some(cells) = self.mesh.patch_neighbour_cells(p) {
                pairs.extend(self.mesh.patch_face_cells(p).iter().copied().zip(cells.iter().copied()));
            }
        }
        CsrPattern::from_pairs(self.diag.len(), pairs)
    }

    fn component_system(&self, psi: &GeometricField<T>, cmpt: usize, pattern: CsrPattern) -> ComponentSystem {
        let mut matrix = CsrMatrix::zeros(pattern);
        let mut rhs: Vec<f64> = self.source.iter().map(|s| s.component(cmpt)).collect();
        let owner = self.mesh.owner();
        let neighbour = self.mesh.neighbour();

        for (c, &d) in self.diag.iter().enumerate() {
            matrix.add(c, c, d);
        }
        for f in 0..self.upper.len() {
            matrix.add(owner[f], neighbour[f], self.upper[f]);
            matrix.add(neighbour[f], owner[f], self.lower[f]);
        }
        for (p, pf) in psi.boundary_field().iter().enumerate() {
            let ic = &self.internal_coeffs[p];
            if ic.is_empty() {
                continue;
            }
            let bc = &self.boundary_coeffs[p];
            let cells = self.mesh.patch_face_cells(p);
            for (&cell, c) in cells.iter().zip(ic) {
                matrix.add(cell, cell, c.component(cmpt));
            }
            match (pf.is_coupled(), self.mesh.patch_neighbour_cells(p)) {
                (true, Some(nbr)) => {
                    for ((&cell, &other), c) in cells.iter().zip(nbr).zip(bc) {
                        matrix.add(cell, other, -c.component(cmpt));
                    }
                }
                _ => {
                    for (&cell, c) in cells.iter().zip(bc) {
                        rhs[cell] += c.component(cmpt);
                    }
                }
            }
        }
        ComponentSystem { matrix, rhs }
    }
}

/// 归一化因子与归一化 L1 残差
fn normalised_residual(matrix: &CsrMatrix, rhs: &[f64], x: &[f64]) -> (f64, f64) {
    let n = x.len();
    let mut ax = vec![0.0; n];
    matrix.mul_vec(x, &mut ax);
    let mean = if n > 0 { x.iter().sum::<f64>() / n as f64 } else { 0.0 };
    let mut ax_ref = vec![0.0; n];
    matrix.mul_vec(&vec![mean; n], &mut ax_ref);

    let mut norm_factor = NORM_FACTOR_FLOOR;
    let mut residual = 0.0;
    for i in 0..n {
        norm_factor += (ax[i] - ax_ref[i]).abs() + (rhs[i] - ax_ref[i]).abs();
        residual += (rhs[i] - ax[i]).abs();
    }
    (norm_factor, residual / norm_factor)
}

fn solve_component(
    system: &ComponentSystem,
    x: &mut [f64],
    settings: &SolverSettings,
    field_name: &str,
    component: usize,
) -> FvResult<SolverPerformance> {
    let symmetric = system.matrix.is_symmetric(SYMMETRY_TOL);
    let solver_name = select_solver(&settings.solver, symmetric, field_name);
    let (norm_factor, initial_residual) = normalised_residual(&system.matrix, &system.rhs, x);

    let mut perf = SolverPerformance {
        solver_name: solver_name.to_string(),
        field_name: field_name.to_string(),
        component,
        initial_residual,
        final_residual: initial_residual,
        n_iterations: 0,
        converged: initial_residual < settings.tolerance,
    };
    if perf.converged || x.is_empty() {
        return Ok(perf);
    }

    // ‖r‖₁ ≤ √n ‖r‖₂
    let atol = settings.tolerance * norm_factor / (x.len() as f64).sqrt();
    let config = SolverConfig::new(settings.rel_tol, settings.max_iter).with_atol(atol);
    let mut solver = create_solver(solver_name, config).ok_or_else(|| {
        FvError::unknown_type(
            "linear solver",
            solver_name,
            crate::linear_algebra::SOLVER_NAMES.iter().map(|s| s.to_string()).collect(),
        )
    })?;
    let precond = create_preconditioner(&settings.preconditioner, &system.matrix).ok_or_else(|| {
        FvError::unknown_type(
            "preconditioner",
            &settings.preconditioner,
            crate::linear_algebra::PRECONDITIONER_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    })?;

    let result = solver.solve(&system.matrix, &system.rhs, x, precond.as_ref());
    let (_, final_residual) = normalised_residual(&system.matrix, &system.rhs, x);
    perf.final_residual = final_residual;
    perf.n_iterations = result.iterations;
    perf.converged = final_residual < settings.tolerance
        || (settings.rel_tol > 0.0 && final_residual < settings.rel_tol * initial_residual);
    if !perf.converged {
        tracing::warn!(
            field = field_name,
            component,
            status = ?result.status,
            "线性求解未收敛"
        );
    }
    Ok(perf)
}

/// `auto` 按对称性选择；对称求解器用于非对称矩阵时改用 PBiCGStab
fn select_solver<'a>(name: &'a str, symmetric: bool, field_name: &str) -> &'a str {
    match name {
        "auto" if symmetric => "PCG",
        "auto" => "PBiCGStab",
        "PCG" if !symmetric => {
            tracing::warn!(field = field_name, "PCG 不适用于非对称矩阵，改用 PBiCGStab");
            "PBiCGStab"
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::patch_types;
    use crate::fv_mesh::FvMesh;
    use crate::matrix::fvm::{self, Diffusivity};
    use fv_foundation::dimension::{DIMLESS, DIM_KINEMATIC_VISCOSITY};
    use fv_foundation::Dimensioned;
    use fv_mesh::BoxMeshBuilder;
    use std::sync::Arc;

    fn conduction() -> (Arc<FvMesh>, GeometricField<f64>) {
        let mesh = Arc::new(FvMesh::new(BoxMeshBuilder::new(8, 1, 1, 1.0, 0.125, 0.125).build().unwrap()).unwrap());
        let mut types = patch_types(&mesh, "zeroGradient");
        types[0] = "fixedValue";
        types[1] = "fixedValue";
        let mut t = GeometricField::new("T", Arc::clone(&mesh), DIMLESS, &types).unwrap();
        t.boundary_field_mut()[1].force_assign(&[1.0]).unwrap();
        (mesh, t)
    }

    #[test]
    fn test_steady_conduction_is_linear() {
        let (mesh, mut t) = conduction();
        let nu = Dimensioned::new("nu", DIM_KINEMATIC_VISCOSITY, 1.0);
        let mut m = fvm::laplacian(Diffusivity::Uniform(&nu), &t).unwrap();
        m.negate();
        let mut controls = SolutionControls::default();
        controls.solvers.insert(
            "T".into(),
            SolverSettings {
                tolerance: 1e-12,
                ..Default::default()
            },
        );
        let mut other = t.clone_named("other");
        assert!(matches!(m.solve(&mut other, &controls), Err(FvError::FieldMismatch { .. })));
        let perf = m.solve(&mut t, &controls).unwrap();
        assert_eq!(perf.len(), 1);
        assert_eq!(perf[0].solver_name, "PCG");
        assert!(perf[0].converged);
        for (v, c) in t.primitive_field().iter().zip(mesh.cell_centres()) {
            assert!((v - c.x).abs() < 1e-8);
        }
    }

    #[test]
    fn test_named_pcg_falls_back_for_asymmetric() {
        assert_eq!(select_solver("PCG", false, "T"), "PBiCGStab");
        assert_eq!(select_solver("auto", true, "T"), "PCG");
        assert_eq!(select_solver("PBiCG", true, "T"), "PBiCG");
    }
}
