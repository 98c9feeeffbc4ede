// apps/fv_cli/src/commands/validate.rs

//! 输入文件验证命令
//!
//! 检查求解控制 JSON、字典文件，或在生成的网格上读取场文件。

use crate::case::CaseConfig;
use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use fv_core::{FieldRegistries, FvMesh, GeometricField, SolutionControls};
use fv_foundation::{Dictionary, FieldValue, SymmTensor, Vector};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 场值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FieldKind {
    Scalar,
    Vector,
    SymmTensor,
}

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 求解控制文件 (JSON)
    #[arg(long)]
    pub controls: Option<PathBuf>,

    /// 字典文件
    #[arg(long)]
    pub dict: Option<PathBuf>,

    /// 场文件
    #[arg(long)]
    pub field: Option<PathBuf>,

    /// 场值类型
    #[arg(long, value_enum, default_value = "scalar")]
    pub field_kind: FieldKind,

    /// 生成网格用的算例配置，省略时使用默认网格
    #[arg(long)]
    pub case: Option<PathBuf>,

    /// 严格模式（警告也视为错误）
    #[arg(long)]
    pub strict: bool,
}

/// 验证结果
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_ok_strict(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("=== 输入文件验证 ===");

    if args.controls.is_none() && args.dict.is_none() && args.field.is_none() {
        println!("用法: fv_cli validate --controls <controls.json>");
        println!("      fv_cli validate --dict <字典文件>");
        println!("      fv_cli validate --field <场文件> [--field-kind vector] [--case <case.json>]");
        return Ok(());
    }

    let mut result = ValidationResult::default();
    if let Some(path) = &args.controls {
        validate_controls(path, &mut result);
    }
    if let Some(path) = &args.dict {
        validate_dictionary(path, &mut result);
    }
    if let Some(path) = &args.field {
        validate_field(path, args.field_kind, args.case.as_deref(), &mut result);
    }

    print_validation_result(&result, args.strict)
}

pub fn validate_controls(path: &Path, result: &mut ValidationResult) {
    println!("\n检查求解控制: {}", path.display());
    let controls = match SolutionControls::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            result.add_error(e.to_string());
            return;
        }
    };

    if controls.solvers.is_empty() {
        result.add_warning("未配置任何线性求解器, 全部场使用默认设置");
    }
    let factors = controls
        .relaxation_factors
        .fields
        .iter()
        .chain(&controls.relaxation_factors.equations);
    for (name, &factor) in factors {
        if factor < 0.1 {
            result.add_warning(format!("{name} 的松弛因子 {factor} 过小, 收敛可能很慢"));
        }
    }
    println!("  ✓ 求解控制有效");
}

pub fn validate_dictionary(path: &Path, result: &mut ValidationResult) {
    println!("\n检查字典文件: {}", path.display());
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            result.add_error(format!("无法读取 {}: {e}", path.display()));
            return;
        }
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    match Dictionary::parse(name, &text) {
        Ok(dict) => {
            if dict.is_empty() {
                result.add_warning("字典为空");
            }
            println!("  ✓ 字典格式有效");
        }
        Err(e) => result.add_error(e.to_string()),
    }
}

pub fn validate_field(path: &Path, kind: FieldKind, case: Option<&Path>, result: &mut ValidationResult) {
    println!("\n检查场文件: {}", path.display());
    let config = match case {
        Some(p) => match CaseConfig::from_file(p) {
            Ok(c) => c,
            Err(e) => {
                result.add_error(format!("算例配置: {e}"));
                return;
            }
        },
        None => CaseConfig::default(),
    };
    let mesh = match config.mesh.builder().build().and_then(FvMesh::new) {
        Ok(m) => Arc::new(m),
        Err(e) => {
            result.add_error(format!("生成网格失败: {e}"));
            return;
        }
    };
    match kind {
        FieldKind::Scalar => check_field::<f64>(path, mesh, result),
        FieldKind::Vector => check_field::<Vector>(path, mesh, result),
        FieldKind::SymmTensor => check_field::<SymmTensor>(path, mesh, result),
    }
}

fn check_field<T: FieldValue>(path: &Path, mesh: Arc<FvMesh>, result: &mut ValidationResult) {
    let field = match GeometricField::<T>::read(path, mesh, &FieldRegistries::new()) {
        Ok(f) => f,
        Err(e) => {
            result.add_error(e.to_string());
            return;
        }
    };
    let non_finite = field
        .primitive_field()
        .iter()
        .filter(|v| !v.mag().is_finite())
        .count();
    if non_finite > 0 {
        result.add_warning(format!("{} 有 {non_finite} 个非有限单元值", field.name()));
    }
    println!("  ✓ 场 {} 与网格一致 ({} 个补丁)", field.name(), field.boundary_field().len());
}

fn print_validation_result(result: &ValidationResult, strict: bool) -> Result<()> {
    println!("\n=== 验证结果 ===");

    if !result.errors.is_empty() {
        println!("\n错误 ({}):", result.errors.len());
        for err in &result.errors {
            error!("{err}");
            println!("  ✗ {err}");
        }
    }

    if !result.warnings.is_empty() {
        println!("\n警告 ({}):", result.warnings.len());
        for warning in &result.warnings {
            warn!("{warning}");
            println!("  ⚠ {warning}");
        }
    }

    let success = if strict {
        result.is_ok_strict()
    } else {
        result.is_ok()
    };
    if success {
        println!("\n✓ 验证通过");
        Ok(())
    } else {
        println!("\n✗ 验证失败");
        bail!(
            "验证失败：发现 {} 个错误，{} 个警告",
            result.errors.len(),
            result.warnings.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_core::fields::patch_types;
    use fv_core::FieldFormat;
    use fv_foundation::dimension::DIMLESS;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fv_cli_validate_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_controls_with_bad_factor() {
        let dir = scratch_dir("controls");
        let path = dir.join("controls.json");
        std::fs::write(&path, r#"{ "relaxation_factors": { "fields": { "p": 2.0 } } }"#).unwrap();
        let mut result = ValidationResult::default();
        validate_controls(&path, &mut result);
        assert!(!result.is_ok());

        std::fs::write(&path, r#"{ "relaxation_factors": { "fields": { "p": 0.05 } } }"#).unwrap();
        let mut result = ValidationResult::default();
        validate_controls(&path, &mut result);
        assert!(result.is_ok());
        assert!(!result.is_ok_strict());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_dictionary_syntax_error() {
        let dir = scratch_dir("dict");
        let path = dir.join("transportProperties");
        std::fs::write(&path, "nu [0 2 -1 0 0 0 0] 1e-5;\nsub { a 1; ").unwrap();
        let mut result = ValidationResult::default();
        validate_dictionary(&path, &mut result);
        assert_eq!(result.errors.len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_field_against_default_mesh() {
        let dir = scratch_dir("field");
        let mesh = Arc::new(FvMesh::new(CaseConfig::default().mesh.builder().build().unwrap()).unwrap());
        let types = patch_types(&mesh, "zeroGradient");
        let t = GeometricField::<f64>::new("T", mesh, DIMLESS, &types).unwrap();
        let path = dir.join("T");
        t.write(&path, FieldFormat::default()).unwrap();

        let mut result = ValidationResult::default();
        validate_field(&path, FieldKind::Scalar, None, &mut result);
        assert!(result.is_ok_strict(), "{result:?}");

        let mut result = ValidationResult::default();
        validate_field(&path, FieldKind::Vector, None, &mut result);
        assert!(!result.is_ok());
        std::fs::remove_dir_all(&dir).ok();
    }
}
