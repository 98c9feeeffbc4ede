// crates/fv_core/src/config.rs

//! 求解控制
//!
//! 线性求解器设置、松弛因子与离散格式默认值，从 JSON 文件读取，
//! 加载时统一验证一次。
//!
//! ```json
//! {
//!   "solvers": {
//!     "T":      { "solver": "PBiCGStab", "preconditioner": "DILU", "tolerance": 1e-8, "rel_tol": 0.01 },
//!     "TFinal": { "solver": "PBiCGStab", "preconditioner": "DILU", "tolerance": 1e-8 }
//!   },
//!   "relaxation_factors": {
//!     "fields":    { "p": 0.3 },
//!     "equations": { "U": 0.7, "default": 0.9 }
//!   },
//!   "schemes": { "ddt": "Euler", "div": "upwind" }
//! }
//! ```
//!
//! 查找顺序：最终迭代时先找 `<name>Final`，再找 `<name>`，最后找 `default`。

use crate::linear_algebra::{PRECONDITIONER_NAMES, SOLVER_NAMES};
use fv_foundation::{FvError, FvResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// 默认条目的键
const DEFAULT_KEY: &str = "default";

// ============================================================================
// 线性求解器设置
// ============================================================================

/// 单个场的线性求解器设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// 求解器名称；`auto` 表示对称矩阵用 PCG，其余用 PBiCGStab
    #[serde(default = "default_solver")]
    pub solver: String,

    /// 预条件器名称
    #[serde(default = "default_preconditioner")]
    pub preconditioner: String,

    /// 归一化残差的绝对容差
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// 相对初始残差的容差，0 表示不使用
    #[serde(default)]
    pub rel_tol: f64,

    /// 最大迭代次数
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
}

fn default_solver() -> String {
    "auto".into()
}
fn default_preconditioner() -> String {
    "DILU".into()
}
fn default_tolerance() -> f64 {
    1e-8
}
fn default_max_iter() -> usize {
    1000
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            solver: default_solver(),
            preconditioner: default_preconditioner(),
            tolerance: default_tolerance(),
            rel_tol: 0.0,
            max_iter: default_max_iter(),
        }
    }
}

impl SolverSettings {
    fn validate(&self, scope: &str) -> FvResult<()> {
        if self.solver != "auto" && !SOLVER_NAMES.contains(&self.solver.as_str()) {
            return Err(FvError::unknown_type(
                "linear solver",
                &self.solver,
                SOLVER_NAMES.iter().map(|s| s.to_string()).collect(),
            ));
        }
        if !PRECONDITIONER_NAMES.contains(&self.preconditioner.as_str()) {
            return Err(FvError::unknown_type(
                "preconditioner",
                &self.preconditioner,
                PRECONDITIONER_NAMES.iter().map(|s| s.to_string()).collect(),
            ));
        }
        if !(self.tolerance >= 0.0) {
            return Err(FvError::invalid_entry(
                scope,
                "tolerance",
                self.tolerance.to_string(),
                "容差必须非负",
            ));
        }
        if !(0.0..1.0).contains(&self.rel_tol) {
            return Err(FvError::invalid_entry(
                scope,
                "rel_tol",
                self.rel_tol.to_string(),
                "相对容差必须在 [0, 1) 范围内",
            ));
        }
        if self.max_iter == 0 {
            return Err(FvError::invalid_entry(scope, "max_iter", "0", "最大迭代次数必须大于 0"));
        }
        Ok(())
    }
}

// ============================================================================
// 松弛因子
// ============================================================================

/// 场与方程的松弛因子
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelaxationFactors {
    /// 场松弛（`GeometricField::relax`）
    #[serde(default)]
    pub fields: BTreeMap<String, f64>,

    /// 方程松弛（`FvMatrix::relax`）
    #[serde(default)]
    pub equations: BTreeMap<String, f64>,
}

// ============================================================================
// 离散格式
// ============================================================================

/// 时间导数格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DdtScheme {
    /// 一阶隐式
    #[default]
    Euler,
    /// 二阶后向差分，需要两层旧时间
    #[serde(rename = "backward")]
    Backward,
    /// 稳态，不贡献任何项
    #[serde(rename = "steadyState")]
    SteadyState,
}

/// 对流项面插值格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DivScheme {
    /// 一阶迎风
    #[default]
    Upwind,
    /// 中心线性插值
    Linear,
}

/// 离散格式默认值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemeSettings {
    #[serde(default)]
    pub ddt: DdtScheme,

    #[serde(default)]
    pub div: DivScheme,

    /// 按场覆盖的对流格式
    #[serde(default)]
    pub div_fields: BTreeMap<String, DivScheme>,
}

impl SchemeSettings {
    /// 场 `name` 的对流格式
    pub fn div_scheme(&self, name: &str) -> DivScheme {
        self.div_fields.get(name).copied().unwrap_or(self.div)
    }
}

// ============================================================================
// 求解控制
// ============================================================================

/// 求解控制
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolutionControls {
    /// 按场名的线性求解器设置
    #[serde(default)]
    pub solvers: BTreeMap<String, SolverSettings>,

    #[serde(default)]
    pub relaxation_factors: RelaxationFactors,

    #[serde(default)]
    pub schemes: SchemeSettings,

    /// 当前是否为外迭代的最后一次（运行时状态，不序列化）
    #[serde(skip)]
    final_iteration: bool,
}

impl SolutionControls {
    /// 从 JSON 文件加载并验证
    pub fn from_file<P: AsRef<Path>>(path: P) -> FvResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FvError::file_not_found(path));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// 从 JSON 文本加载并验证
    pub fn from_json(text: &str) -> FvResult<Self> {
        let controls: SolutionControls = serde_json::from_str(text)?;
        controls.validate()?;
        Ok(controls)
    }

    /// 序列化为 JSON
    pub fn to_json(&self) -> FvResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> FvResult<()> {
        for (name, settings) in &self.solvers {
            settings.validate(&format!("solvers/{name}"))?;
        }
        let groups = [
            ("relaxation_factors/fields", &self.relaxation_factors.fields),
            ("relaxation_factors/equations", &self.relaxation_factors.equations),
        ];
        for (scope, factors) in groups {
            for (name, &factor) in factors {
                if !(0.0..=1.0).contains(&factor) {
                    return Err(FvError::invalid_entry(
                        scope,
                        name,
                        factor.to_string(),
                        "松弛因子必须在 [0, 1] 范围内",
                    ));
                }
            }
        }
        Ok(())
    }

    /// 是否为最终迭代
    #[inline]
    pub fn final_iteration(&self) -> bool {
        self.final_iteration
    }

    /// 设置最终迭代标志
    pub fn set_final_iteration(&mut self, final_iteration: bool) {
        self.final_iteration = final_iteration;
    }

    /// 场 `name` 的求解器设置，缺失时使用默认设置
    pub fn solver_settings(&self, name: &str) -> SolverSettings {
        self.lookup(&self.solvers, name)
            .cloned()
            .unwrap_or_default()
    }

    /// 场松弛因子
    pub fn field_relaxation_factor(&self, name: &str) -> Option<f64> {
        self.lookup(&self.relaxation_factors.fields, name).copied()
    }

    /// 方程松弛因子
    pub fn equation_relaxation_factor(&self, name: &str) -> Option<f64> {
        self.lookup(&self.relaxation_factors.equations, name).copied()
    }

    fn lookup<'a, V>(&self, table: &'a BTreeMap<String, V>, name: &str) -> Option<&'a V> {
        if self.final_iteration {
            if let Some(v) = table.get(&format!("{name}Final")) {
                return Some(v);
            }
        }
        table.get(name).or_else(|| table.get(DEFAULT_KEY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "solvers": {
            "T": { "solver": "PBiCGStab", "tolerance": 1e-6, "rel_tol": 0.1 },
            "TFinal": { "solver": "PBiCGStab", "tolerance": 1e-6 }
        },
        "relaxation_factors": {
            "fields": { "p": 0.3 },
            "equations": { "U": 0.7, "UFinal": 1.0, "default": 0.9 }
        },
        "schemes": { "ddt": "backward", "div": "linear", "div_fields": { "k": "upwind" } }
    }"#;

    #[test]
    fn test_parse_and_lookup_order() {
        let mut c = SolutionControls::from_json(SAMPLE).unwrap();
        assert_eq!(c.solver_settings("T").rel_tol, 0.1);
        assert_eq!(c.solver_settings("T").preconditioner, "DILU");
        assert_eq!(c.equation_relaxation_factor("U"), Some(0.7));
        assert_eq!(c.equation_relaxation_factor("k"), Some(0.9));
        assert_eq!(c.field_relaxation_factor("T"), None);

        c.set_final_iteration(true);
        assert_eq!(c.solver_settings("T").rel_tol, 0.0);
        assert_eq!(c.equation_relaxation_factor("U"), Some(1.0));

        assert_eq!(c.schemes.ddt, DdtScheme::Backward);
        assert_eq!(c.schemes.div_scheme("k"), DivScheme::Upwind);
        assert_eq!(c.schemes.div_scheme("T"), DivScheme::Linear);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad_factor = r#"{ "relaxation_factors": { "fields": { "p": 1.5 } } }"#;
        assert!(matches!(
            SolutionControls::from_json(bad_factor),
            Err(FvError::InvalidEntry { .. })
        ));
        let bad_solver = r#"{ "solvers": { "p": { "solver": "GAMG" } } }"#;
        assert!(matches!(
            SolutionControls::from_json(bad_solver),
            Err(FvError::UnknownType { .. })
        ));
        assert!(SolutionControls::from_json("{ not json").is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let c = SolutionControls::from_json(SAMPLE).unwrap();
        let back = SolutionControls::from_json(&c.to_json().unwrap()).unwrap();
        assert_eq!(c, back);
    }
}
