// apps/fv_cli/src/case.rs

//! 标量输运算例配置
//!
//! ```json
//! {
//!   "mesh": { "cells": [40, 4, 1], "lengths": [2.0, 0.2, 0.05], "two_dimensional": true },
//!   "field": "T",
//!   "fixed_values": [ { "patch": "xmin", "value": 1.0 }, { "patch": "xmax", "value": 0.0 } ],
//!   "velocity": [1.0, 0.0, 0.0],
//!   "diffusivity": 0.01,
//!   "delta_t": 0.005,
//!   "n_steps": 100,
//!   "write_interval": 20,
//!   "output": { "format": "binary" },
//!   "controls": { "solvers": { "T": { "solver": "PBiCGStab" } } }
//! }
//! ```

use fv_core::{FieldFormat, SolutionControls};
use fv_foundation::{FvError, FvResult, Precision};
use fv_mesh::{BoxMeshBuilder, BoxSide};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 结构化长方体网格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshConfig {
    #[serde(default = "default_cells")]
    pub cells: [usize; 3],

    #[serde(default = "default_lengths")]
    pub lengths: [f64; 3],

    /// z 方向两侧取 empty
    #[serde(default = "default_true")]
    pub two_dimensional: bool,
}

fn default_cells() -> [usize; 3] {
    [20, 4, 1]
}

fn default_lengths() -> [f64; 3] {
    [1.0, 0.2, 0.05]
}

fn default_true() -> bool {
    true
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            cells: default_cells(),
            lengths: default_lengths(),
            two_dimensional: true,
        }
    }
}

impl MeshConfig {
    pub fn builder(&self) -> BoxMeshBuilder {
        let [nx, ny, nz] = self.cells;
        let [lx, ly, lz] = self.lengths;
        let builder = BoxMeshBuilder::new(nx, ny, nz, lx, ly, lz);
        if self.two_dimensional {
            builder.with_empty(BoxSide::ZMin, "frontAndBack")
        } else {
            builder
        }
    }
}

/// 固定值补丁
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedValue {
    pub patch: String,
    pub value: f64,
}

/// 写出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Ascii,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// ASCII 有效数字位数，`null` 时精确回读
    #[serde(default = "default_precision")]
    pub precision: Option<usize>,
}

fn default_precision() -> Option<usize> {
    Some(6)
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Ascii,
            precision: default_precision(),
        }
    }
}

impl OutputConfig {
    pub fn field_format(&self) -> FieldFormat {
        match (self.format, self.precision) {
            (OutputFormat::Binary, _) => FieldFormat::Binary,
            (OutputFormat::Ascii, Some(digits)) => FieldFormat::Ascii(Precision::Significant(digits)),
            (OutputFormat::Ascii, None) => FieldFormat::Ascii(Precision::Exact),
        }
    }
}

/// 算例配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseConfig {
    #[serde(default)]
    pub mesh: MeshConfig,

    #[serde(default = "default_field")]
    pub field: String,

    #[serde(default = "default_fixed_values")]
    pub fixed_values: Vec<FixedValue>,

    #[serde(default = "default_velocity")]
    pub velocity: [f64; 3],

    /// 运动扩散系数 [m²/s]
    #[serde(default = "default_diffusivity")]
    pub diffusivity: f64,

    #[serde(default = "default_delta_t")]
    pub delta_t: f64,

    #[serde(default = "default_n_steps")]
    pub n_steps: usize,

    /// 每隔多少步写出，0 表示只写最后一步
    #[serde(default)]
    pub write_interval: usize,

    /// 每步的外迭代次数
    #[serde(default = "default_n_outer")]
    pub n_outer_correctors: usize,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub controls: SolutionControls,
}

fn default_field() -> String {
    "T".into()
}

fn default_fixed_values() -> Vec<FixedValue> {
    vec![
        FixedValue {
            patch: BoxSide::XMin.default_name().into(),
            value: 1.0,
        },
        FixedValue {
            patch: BoxSide::XMax.default_name().into(),
            value: 0.0,
        },
    ]
}

fn default_velocity() -> [f64; 3] {
    [1.0, 0.0, 0.0]
}

fn default_diffusivity() -> f64 {
    0.01
}

fn default_delta_t() -> f64 {
    0.01
}

fn default_n_steps() -> usize {
    10
}

fn default_n_outer() -> usize {
    1
}

impl Default for CaseConfig {
    fn default() -> Self {
        Self {
            mesh: MeshConfig::default(),
            field: default_field(),
            fixed_values: default_fixed_values(),
            velocity: default_velocity(),
            diffusivity: default_diffusivity(),
            delta_t: default_delta_t(),
            n_steps: default_n_steps(),
            write_interval: 0,
            n_outer_correctors: default_n_outer(),
            output: OutputConfig::default(),
            controls: SolutionControls::default(),
        }
    }
}

impl CaseConfig {
    /// 从 JSON 文件加载并验证
    pub fn from_file<P: AsRef<Path>>(path: P) -> FvResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FvError::file_not_found(path));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(text: &str) -> FvResult<Self> {
        let config: CaseConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> FvResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> FvResult<()> {
        let invalid = |key: &str, value: String, reason: &str| FvError::invalid_entry("case", key, value, reason);

        if self.mesh.cells.contains(&0) {
            return Err(invalid("mesh/cells", format!("{:?}", self.mesh.cells), "每个方向至少一个单元"));
        }
        if self.mesh.lengths.iter().any(|&l| !(l > 0.0)) {
            return Err(invalid("mesh/lengths", format!("{:?}", self.mesh.lengths), "边长必须为正"));
        }
        if !(self.diffusivity >= 0.0) {
            return Err(invalid("diffusivity", self.diffusivity.to_string(), "不能为负"));
        }
        if !(self.delta_t > 0.0) {
            return Err(invalid("delta_t", self.delta_t.to_string(), "必须为正"));
        }
        if self.n_outer_correctors == 0 {
            return Err(invalid("n_outer_correctors", "0".into(), "至少一次外迭代"));
        }
        if self.field.is_empty() {
            return Err(invalid("field", String::new(), "场名不能为空"));
        }
        if matches!(self.output.precision, Some(0)) {
            return Err(invalid("output/precision", "0".into(), "有效数字至少一位"));
        }
        self.controls.validate()
    }
}
