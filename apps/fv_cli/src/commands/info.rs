// apps/fv_cli/src/commands/info.rs

//! 信息显示命令
//!
//! 列出运行时可选的类型与默认配置。

use crate::case::CaseConfig;
use anyhow::Result;
use clap::Args;
use fv_core::FieldRegistries;
use fv_foundation::{SymmTensor, Vector};
use fv_mesh::renumber_registry;
use fv_models::ModelRegistries;
use tracing::info;

/// 信息显示参数
#[derive(Args)]
pub struct InfoArgs {
    /// 显示已注册的类型
    #[arg(long)]
    pub types: bool,

    /// 以 JSON 显示默认算例配置
    #[arg(long)]
    pub defaults: bool,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    info!("=== 有限体积工具箱信息 ===");
    println!("fv_cli 版本: {}", env!("CARGO_PKG_VERSION"));

    let show_all = !args.types && !args.defaults;
    if args.types || show_all {
        print_registered_types();
    }
    if args.defaults || show_all {
        println!();
        print_default_case()?;
    }
    Ok(())
}

/// (族名, 类型名) 列表
pub fn registered_types() -> Vec<(String, Vec<String>)> {
    let owned = |family: &str, names: Vec<&str>| {
        (family.to_string(), names.into_iter().map(String::from).collect::<Vec<_>>())
    };

    let scalar = FieldRegistries::<f64>::new();
    let vector = FieldRegistries::<Vector>::new();
    let symm = FieldRegistries::<SymmTensor>::new();
    let renumber = renumber_registry();
    let models = ModelRegistries::default();

    let mut families = vec![
        owned("patchField (scalar)", scalar.patch_fields.names()),
        owned("patchField (vector)", vector.patch_fields.names()),
        owned("patchField (symmTensor)", symm.patch_fields.names()),
        owned(scalar.patch_to_patch.family(), scalar.patch_to_patch.names()),
        owned(renumber.family(), renumber.names()),
    ];
    families.extend(models.families().into_iter().map(|(f, names)| owned(f, names)));
    families
}

fn print_registered_types() {
    println!("=== 已注册类型 ===");
    for (family, names) in registered_types() {
        println!("{family}:");
        for name in names {
            println!("  - {name}");
        }
    }
}

fn print_default_case() -> Result<()> {
    println!("=== 默认算例配置 ===");
    println!("{}", CaseConfig::default().to_json()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_families_listed() {
        let families = registered_types();
        let has = |family: &str, name: &str| {
            families
                .iter()
                .any(|(f, names)| f == family && names.iter().any(|n| n == name))
        };
        assert!(has("patchField (scalar)", "fixedValue"));
        assert!(has("patchToPatch", "intersection"));
        assert!(has("renumberMethod", "structured"));
        assert!(has("momentumTransport", "LRR"));
        assert!(has("sootModel", "mixtureFraction"));
    }
}
