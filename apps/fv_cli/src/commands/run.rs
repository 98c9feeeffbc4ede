// apps/fv_cli/src/commands/run.rs

//! 运行标量输运算例
//!
//! 每个时间步求解
//!
//! ```text
//! ddt(T) + div(phi, T) − laplacian(nu, T) = 0
//! ```
//!
//! 两个补丁取固定值，其余补丁零梯度；输运速度均匀。

use crate::case::{CaseConfig, OutputFormat};
use anyhow::{bail, Context, Result};
use clap::Args;
use fv_core::fields::patch_types;
use fv_core::matrix::{fvc, fvm, Diffusivity};
use fv_core::{FieldFormat, FvMesh, GeometricField, RunTime, VolScalarField};
use fv_foundation::dimension::{DIMLESS, DIM_KINEMATIC_VISCOSITY, DIM_VELOCITY};
use fv_foundation::{Dimensioned, Vector};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// 运行参数
#[derive(Args)]
pub struct RunArgs {
    /// 算例配置文件 (JSON)，省略时使用默认算例
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 输出目录
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// 覆盖时间步数
    #[arg(long)]
    pub steps: Option<usize>,

    /// 以二进制格式写出
    #[arg(long)]
    pub binary: bool,
}

/// 运行统计
#[derive(Debug)]
pub struct RunSummary {
    pub n_steps: usize,
    pub end_time: f64,
    pub min: f64,
    pub max: f64,
    pub written: Vec<PathBuf>,
}

/// 执行运行命令
pub fn execute(args: RunArgs) -> Result<()> {
    info!("=== 标量输运算例 ===");

    let mut case = match &args.config {
        Some(path) => CaseConfig::from_file(path)
            .with_context(|| format!("读取算例配置 {} 失败", path.display()))?,
        None => {
            info!("未指定配置文件, 使用默认算例");
            CaseConfig::default()
        }
    };
    if let Some(steps) = args.steps {
        case.n_steps = steps;
    }
    if args.binary {
        case.output.format = OutputFormat::Binary;
    }

    let start = Instant::now();
    let summary = run_case(&case, &args.output)?;

    info!("=== 运行完成 ===");
    info!("时间步数: {}", summary.n_steps);
    info!("结束时间: {}", summary.end_time);
    info!("{} 范围: [{:.6}, {:.6}]", case.field, summary.min, summary.max);
    info!("写出文件数: {}", summary.written.len());
    info!("计算时间: {:.3} s", start.elapsed().as_secs_f64());
    Ok(())
}

/// 建网格、建场并推进全部时间步
pub fn run_case(case: &CaseConfig, output: &Path) -> Result<RunSummary> {
    let time = RunTime::new(0.0, case.delta_t)?.shared();
    let poly = case.mesh.builder().build().context("生成网格失败")?;
    let mesh = Arc::new(FvMesh::with_time(poly, time)?);
    info!(
        cells = mesh.n_cells(),
        patches = mesh.n_patches(),
        "网格: {:?} 单元",
        case.mesh.cells
    );

    let mut t = scalar_field(case, &mesh)?;
    let u = GeometricField::uniform(
        "U",
        Arc::clone(&mesh),
        &Dimensioned::new("U", DIM_VELOCITY, Vector::from_array(case.velocity)),
        &patch_types(&mesh, "calculated"),
    )?;
    let phi = fvc::flux(&u)?;
    let nu = Dimensioned::new("nu", DIM_KINEMATIC_VISCOSITY, case.diffusivity);

    let mut controls = case.controls.clone();
    let ddt_scheme = controls.schemes.ddt;
    let div_scheme = controls.schemes.div_scheme(&case.field);
    let format = case.output.field_format();

    std::fs::create_dir_all(output).with_context(|| format!("创建输出目录 {} 失败", output.display()))?;
    let mut written = Vec::new();

    for step in 1..=case.n_steps {
        mesh.time().write().advance();
        for outer in 0..case.n_outer_correctors {
            controls.set_final_iteration(outer + 1 == case.n_outer_correctors);
            t.store_prev_iter();

            let mut eqn = fvm::ddt(&mut t, ddt_scheme)?;
            eqn.add_assign(&fvm::div(&phi, &t, div_scheme)?)?;
            eqn.sub_assign(&fvm::laplacian(Diffusivity::Uniform(&nu), &t)?)?;
            eqn.relax_auto(&t, &controls)?;
            eqn.solve(&mut t, &controls)?;
            t.relax_auto(&controls)?;
        }
        t.write_min_max();

        let last = step == case.n_steps;
        if last || (case.write_interval > 0 && step % case.write_interval == 0) {
            written.push(write_time(&t, output, format)?);
        }
    }

    let (min, max) = t.min_max();
    let end_time = mesh.time().read().value();
    Ok(RunSummary {
        n_steps: case.n_steps,
        end_time,
        min,
        max,
        written,
    })
}

/// 初始为零，固定值补丁按配置赋值
fn scalar_field(case: &CaseConfig, mesh: &Arc<FvMesh>) -> Result<VolScalarField> {
    let mut types = patch_types(mesh, "zeroGradient");
    let mut fixed = Vec::with_capacity(case.fixed_values.len());
    for fv in &case.fixed_values {
        let p = mesh.poly().patch_index(&fv.patch)?;
        if mesh.is_empty_patch(p) {
            bail!("补丁 {} 为 empty, 不能指定固定值", fv.patch);
        }
        types[p] = "fixedValue";
        fixed.push((p, fv.value));
    }

    let mut field = GeometricField::new(case.field.as_str(), Arc::clone(mesh), DIMLESS, &types)?;
    for (p, value) in fixed {
        let n = field.patch_field(p).values().len();
        field.boundary_field_mut()[p].force_assign(&vec![value; n])?;
    }
    Ok(field)
}

/// 写到 `<output>/<time>/<field>`
fn write_time(field: &VolScalarField, output: &Path, format: FieldFormat) -> Result<PathBuf> {
    let time_name = field.mesh().time().read().time_name();
    let dir = output.join(time_name);
    std::fs::create_dir_all(&dir).with_context(|| format!("创建时间目录 {} 失败", dir.display()))?;
    let path = dir.join(field.name());
    field.write(&path, format)?;
    info!(path = %path.display(), "写出场");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_core::FieldRegistries;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fv_cli_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_run_stays_between_fixed_values() {
        let dir = scratch_dir("bounded");
        let case = CaseConfig::from_json(r#"{ "n_steps": 5, "write_interval": 2 }"#).unwrap();
        let summary = run_case(&case, &dir).unwrap();

        assert_eq!(summary.n_steps, 5);
        assert!((summary.end_time - 0.05).abs() < 1e-12);
        assert!(summary.min >= -1e-10 && summary.max <= 1.0 + 1e-10);
        assert!(summary.max > 0.0);
        // 第 2、4、5 步
        assert_eq!(summary.written.len(), 3);
        assert!(summary.written.iter().all(|p| p.exists()));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_binary_output_reads_back() {
        let dir = scratch_dir("binary");
        let case = CaseConfig::from_json(r#"{ "n_steps": 2, "output": { "format": "binary" } }"#).unwrap();
        let summary = run_case(&case, &dir).unwrap();
        let path = summary.written.last().unwrap();

        let mesh = Arc::new(FvMesh::new(case.mesh.builder().build().unwrap()).unwrap());
        let t = GeometricField::<f64>::read(path, mesh, &FieldRegistries::new()).unwrap();
        assert_eq!(t.name(), "T");
        assert_eq!(t.min_max(), (summary.min, summary.max));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_fixed_value_on_empty_patch_rejected() {
        let dir = scratch_dir("empty");
        let case = CaseConfig::from_json(
            r#"{ "fixed_values": [ { "patch": "frontAndBack", "value": 1.0 } ] }"#,
        )
        .unwrap();
        assert!(run_case(&case, &dir).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }
}
