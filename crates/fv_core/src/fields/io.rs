// crates/fv_core/src/fields/io.rs

//! 场文件读写
//!
//! ASCII 格式为 FoamFile 头加字典：
//!
//! ```text
//! FoamFile
//! {
//!     format      ascii;
//!     class       volScalarField;
//!     location    "0";
//!     object      T;
//! }
//! dimensions      [0 0 0 1 0 0 0];
//! internalField   uniform 300;
//! boundaryField
//! {
//!     inlet
//!     {
//!         type            fixedValue;
//!         value           uniform 400;
//!     }
//! }
//! ```
//!
//! 二进制格式为 4 字节魔数、`u32` 版本号（小端）和 bincode 记录。
//! 补丁条目以精确精度的字典文本保存，值单独保存，读回时不经过文本。

use super::geometric::GeometricField;
use super::patch_field::{new_patch_field, patch_field_registry, PatchFieldArgs, PatchFieldRegistry};
use super::dimensioned::DimensionedField;
use crate::coupling::{patch_to_patch_registry, PatchToPatchRegistry};
use crate::fv_mesh::FvMesh;
use fv_foundation::dictionary::read_field_value;
use fv_foundation::token::{tokens_to_string, TokenCursor, TokenKind};
use fv_foundation::{DimensionSet, Dictionary, FieldValue, FvError, FvResult, OStream, Precision};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// 二进制场文件魔数
pub const BINARY_MAGIC: &[u8; 4] = b"FVFB";

/// 二进制格式版本
pub const BINARY_VERSION: u32 = 1;

/// 超过该长度的非均匀列表逐行写出
const INLINE_LIST_LIMIT: usize = 10;

/// 写出格式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldFormat {
    Ascii(Precision),
    Binary,
}

impl Default for FieldFormat {
    fn default() -> Self {
        FieldFormat::Ascii(Precision::default())
    }
}

/// 读场时使用的注册表
pub struct FieldRegistries<T: FieldValue> {
    pub patch_fields: PatchFieldRegistry<T>,
    pub patch_to_patch: PatchToPatchRegistry,
}

impl<T: FieldValue> FieldRegistries<T> {
    pub fn new() -> Self {
        Self {
            patch_fields: patch_field_registry(),
            patch_to_patch: patch_to_patch_registry(),
        }
    }
}

impl<T: FieldValue> Default for FieldRegistries<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 体积场的类名，如 `volScalarField`
pub fn class_name<T: FieldValue>() -> String {
    let mut chars = T::TYPE_NAME.chars();
    match chars.next() {
        Some(first) => format!("vol{}{}Field", first.to_ascii_uppercase(), chars.as_str()),
        None => "volField".to_string(),
    }
}

// ============================================================================
// 场值条目
// ============================================================================

/// 读取 `uniform v` 或 `nonuniform List<type> N(...)` 条目
pub(crate) fn read_field_entry<T: FieldValue>(
    dict: &Dictionary,
    key: &str,
    size: usize,
) -> FvResult<Vec<T>> {
    let tokens = dict.tokens(key)?;
    let invalid =
        |reason: String| FvError::invalid_entry(dict.name(), key, tokens_to_string(tokens), reason);
    let mut cursor = TokenCursor::new(tokens);

    let values = match cursor.next_word().map_err(invalid)?.as_str() {
        "uniform" => vec![read_field_value::<T>(&mut cursor).map_err(invalid)?; size],
        "nonuniform" => {
            if let Some(TokenKind::Word(w)) = cursor.peek().map(|t| &t.kind) {
                if w.starts_with("List<") {
                    cursor.next_word().map_err(invalid)?;
                }
            }
            let values = read_field_list::<T>(&mut cursor).map_err(invalid)?;
            FvError::check_size(&dict.scoped_name(key), size, values.len())?;
            values
        }
        other => {
            return Err(invalid(format!("期望 uniform 或 nonuniform，实际为 {other}")));
        }
    };
    if !cursor.is_empty() {
        return Err(invalid("条目末尾有多余内容".into()));
    }
    Ok(values)
}

/// `(a b ...)`、`N(a b ...)` 或 `N{a}`
fn read_field_list<T: FieldValue>(cursor: &mut TokenCursor<'_>) -> Result<Vec<T>, String> {
    let size = match cursor.peek().map(|t| &t.kind) {
        Some(TokenKind::Number(_)) => Some(cursor.next_label()?),
        _ => None,
    };
    if let Some(n) = size {
        if cursor.eat_punct('{') {
            let value = read_field_value::<T>(cursor)?;
            cursor.expect_punct('}')?;
            return Ok(vec![value; n]);
        }
    }
    cursor.expect_punct('(')?;
    let mut values = Vec::with_capacity(size.unwrap_or(0));
    while !cursor.eat_punct(')') {
        if cursor.is_empty() {
            return Err("列表缺少 ')'".into());
        }
        values.push(read_field_value::<T>(cursor)?);
    }
    match size {
        Some(n) if n != values.len() => Err(format!("列表声明 {n} 项，实际 {} 项", values.len())),
        _ => Ok(values),
    }
}

/// 写出场值条目；全部相等时写为 uniform
pub(crate) fn write_field_entry<T: FieldValue>(os: &mut OStream, key: &str, values: &[T]) {
    if let Some(first) = values.first() {
        if values.iter().all(|v| v == first) {
            let text = format!("uniform {}", os.format_value(first));
            os.write_entry(key, &text);
            return;
        }
    }

    os.write_keyword(key);
    os.write_raw(&format!("nonuniform List<{}> ", T::TYPE_NAME));
    if values.len() <= INLINE_LIST_LIMIT {
        let items: Vec<String> = values.iter().map(|v| os.format_value(v)).collect();
        os.write_raw(&format!("{}({})", values.len(), items.join(" ")));
    } else {
        os.newline();
        os.write_raw(&values.len().to_string());
        os.newline();
        os.write_raw("(");
        os.newline();
        for v in values {
            let text = os.format_value(v);
            os.write_raw(&text);
            os.newline();
        }
        os.write_raw(")");
    }
    os.write_raw(";\n");
}

// ============================================================================
// ASCII
// ============================================================================

/// 以 ASCII 格式写出场
pub fn write_ascii<T: FieldValue>(field: &GeometricField<T>, precision: Precision) -> String {
    let mut os = OStream::new(precision);
    let location = field.mesh().time().read().time_name();

    os.begin_block("FoamFile");
    os.write_entry("format", "ascii");
    os.write_entry("class", &class_name::<T>());
    os.write_entry("location", &format!("\"{location}\""));
    os.write_entry("object", field.name());
    os.end_block();
    os.newline();

    os.write_entry("dimensions", &field.dimensions().to_string());
    os.newline();
    write_field_entry(&mut os, "internalField", field.primitive_field());
    os.newline();

    os.begin_block("boundaryField");
    for pf in field.boundary_field() {
        os.begin_block(pf.patch_name());
        pf.write(&mut os);
        os.end_block();
    }
    os.end_block();
    os.into_string()
}

/// 从 ASCII 文本读取场；`context` 为字典名，用于错误信息
pub fn read_ascii<T: FieldValue>(
    context: &str,
    text: &str,
    mesh: Arc<FvMesh>,
    registries: &FieldRegistries<T>,
) -> FvResult<GeometricField<T>> {
    let dict = Dictionary::parse(context, text)?;
    let header = dict.sub_dict("FoamFile")?;
    check_class::<T>(header.name(), &header.lookup::<String>("class")?)?;
    let name: String = header.lookup("object")?;
    let dimensions: DimensionSet = dict.lookup("dimensions")?;
    let internal = read_field_entry::<T>(&dict, "internalField", mesh.n_cells())?;

    let boundary_dict = dict.sub_dict("boundaryField")?;
    let boundary = (0..mesh.n_patches())
        .map(|p| {
            let patch_dict = boundary_dict.sub_dict(mesh.patch(p).name())?;
            let args = PatchFieldArgs::new(&mesh, p, &internal, &registries.patch_to_patch);
            new_patch_field(&args, patch_dict, &registries.patch_fields)
        })
        .collect::<FvResult<Vec<_>>>()?;

    let internal = DimensionedField::new(name.clone(), Arc::clone(&mesh), dimensions, internal)?;
    GeometricField::from_components(name, internal, boundary)
}

fn check_class<T: FieldValue>(scope: &str, class: &str) -> FvResult<()> {
    let expected = class_name::<T>();
    if class == expected {
        Ok(())
    } else {
        Err(FvError::invalid_entry(scope, "class", class, format!("期望 {expected}")))
    }
}

// ============================================================================
// 二进制
// ============================================================================

#[derive(Serialize, Deserialize)]
struct FieldRecord<T> {
    name: String,
    class: String,
    dimensions: DimensionSet,
    internal: Vec<T>,
    patches: Vec<PatchRecord<T>>,
}

#[derive(Serialize, Deserialize)]
struct PatchRecord<T> {
    name: String,
    entries: String,
    values: Vec<T>,
}

/// 编码为二进制
pub fn to_binary<T: FieldValue>(field: &GeometricField<T>) -> FvResult<Vec<u8>> {
    let patches = field
        .boundary_field()
        .iter()
        .map(|pf| {
            let mut os = OStream::new(Precision::Exact);
            pf.write_entries(&mut os, false);
            PatchRecord {
                name: pf.patch_name().to_string(),
                entries: os.into_string(),
                values: pf.values().to_vec(),
            }
        })
        .collect();
    let record = FieldRecord {
        name: field.name().to_string(),
        class: class_name::<T>(),
        dimensions: field.dimensions(),
        internal: field.primitive_field().to_vec(),
        patches,
    };

    let mut bytes = Vec::with_capacity(8);
    bytes.extend_from_slice(BINARY_MAGIC);
    bytes.extend_from_slice(&BINARY_VERSION.to_le_bytes());
    bytes.extend(bincode::serialize(&record)?);
    Ok(bytes)
}

/// 从二进制解码
pub fn from_binary<T: FieldValue>(
    bytes: &[u8],
    mesh: Arc<FvMesh>,
    registries: &FieldRegistries<T>,
) -> FvResult<GeometricField<T>> {
    if bytes.len() < 8 || &bytes[..4] != BINARY_MAGIC {
        return Err(FvError::serialization("不是二进制场文件"));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[4..8]);
    let version = u32::from_le_bytes(version);
    if version != BINARY_VERSION {
        return Err(FvError::serialization(format!(
            "不支持的二进制场版本 {version}（当前 {BINARY_VERSION}）"
        )));
    }
    let record: FieldRecord<T> = bincode::deserialize(&bytes[8..])?;
    check_class::<T>(&record.name, &record.class)?;
    FvError::check_size(&record.name, mesh.n_cells(), record.internal.len())?;
    FvError::check_size(
        &format!("{} 补丁数", record.name),
        mesh.n_patches(),
        record.patches.len(),
    )?;

    let boundary = record
        .patches
        .iter()
        .enumerate()
        .map(|(p, patch)| {
            let expected = mesh.patch(p).name();
            if patch.name != expected {
                return Err(FvError::invalid_mesh(format!(
                    "场 {} 第 {p} 个补丁为 {}，网格中为 {expected}",
                    record.name, patch.name
                )));
            }
            let scope = format!("{}.boundaryField.{}", record.name, patch.name);
            let dict = Dictionary::parse(scope, &patch.entries)?;
            let args = PatchFieldArgs::new(&mesh, p, &record.internal, &registries.patch_to_patch)
                .with_values(&patch.values);
            new_patch_field(&args, &dict, &registries.patch_fields)
        })
        .collect::<FvResult<Vec<_>>>()?;

    let internal = DimensionedField::new(
        record.name.clone(),
        Arc::clone(&mesh),
        record.dimensions,
        record.internal,
    )?;
    GeometricField::from_components(record.name, internal, boundary)
}

// ============================================================================
// 文件
// ============================================================================

/// 写出场文件
pub fn write_field<T: FieldValue>(
    field: &GeometricField<T>,
    path: impl AsRef<Path>,
    format: FieldFormat,
) -> FvResult<()> {
    let path = path.as_ref();
    let bytes = match format {
        FieldFormat::Ascii(precision) => write_ascii(field, precision).into_bytes(),
        FieldFormat::Binary => to_binary(field)?,
    };
    std::fs::write(path, bytes)
        .map_err(|e| FvError::io_with_source(format!("写入 {}", path.display()), e))?;
    tracing::debug!(field = field.name(), path = %path.display(), "场已写出");
    Ok(())
}

/// 读取场文件，按魔数判断格式
pub fn read_field<T: FieldValue>(
    path: impl AsRef<Path>,
    mesh: Arc<FvMesh>,
    registries: &FieldRegistries<T>,
) -> FvResult<GeometricField<T>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(FvError::file_not_found(path));
    }
    let bytes = std::fs::read(path)
        .map_err(|e| FvError::io_with_source(format!("读取 {}", path.display()), e))?;
    if bytes.starts_with(BINARY_MAGIC) {
        return from_binary(&bytes, mesh, registries);
    }
    let text = String::from_utf8(bytes)
        .map_err(|e| FvError::parse(path.display().to_string(), 0, e.to_string()))?;
    let context = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    read_ascii(&context, &text, mesh, registries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_foundation::Vector;

    #[test]
    fn test_class_names() {
        assert_eq!(class_name::<f64>(), "volScalarField");
        assert_eq!(class_name::<Vector>(), "volVectorField");
        assert_eq!(class_name::<fv_foundation::SymmTensor>(), "volSymmTensorField");
    }

    #[test]
    fn test_read_entry_forms() {
        let dict = Dictionary::parse(
            "T",
            "a uniform 2; b nonuniform List<scalar> 3(1 2 3); c nonuniform 2{4}; d nonuniform (1 2);",
        )
        .unwrap();
        assert_eq!(read_field_entry::<f64>(&dict, "a", 2).unwrap(), vec![2.0, 2.0]);
        assert_eq!(read_field_entry::<f64>(&dict, "b", 3).unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(read_field_entry::<f64>(&dict, "c", 2).unwrap(), vec![4.0, 4.0]);
        assert!(matches!(
            read_field_entry::<f64>(&dict, "d", 3),
            Err(FvError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_entry_names_dictionary() {
        let dict = Dictionary::parse("T", "a constant 2;").unwrap();
        let err = read_field_entry::<f64>(&dict, "a", 1).unwrap_err();
        assert!(err.to_string().contains('T'));
    }

    #[test]
    fn test_write_entry_forms() {
        let mut os = OStream::default();
        write_field_entry(&mut os, "value", &[1.5, 1.5]);
        write_field_entry(&mut os, "gradient", &[1.0, 2.0]);
        write_field_entry::<Vector>(&mut os, "empty", &[]);
        let text = os.into_string();
        assert!(text.contains("uniform 1.5;"));
        assert!(text.contains("nonuniform List<scalar> 2(1 2);"));
        assert!(text.contains("nonuniform List<vector> 0();"));
    }
}
