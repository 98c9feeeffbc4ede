// crates/fv_core/src/coupling/mapped_patch_base.rs

//! 映射补丁配置
//!
//! 描述一个补丁从哪里采样：对侧区域与补丁（或耦合组）、对侧相对本侧
//! 的几何变换，以及网格移动后何时重新求交。
//!
//! ```text
//! neighbourRegion   region0;      // 缺省为本区域
//! neighbourPatch    outlet;       // 或 coupleGroup
//! transformType     translational;
//! separation        (1 0 0);      // 对侧 = 本侧 + separation
//! moveUpdate        detect;       // always | detect | never
//! method            intersection;
//! ```

use crate::fv_mesh::FvMesh;
use fv_foundation::{Dictionary, FvError, FvResult, OStream, Vector};
use fv_mesh::PrimitivePatch;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 本区域名
pub const DEFAULT_REGION: &str = "region0";

/// 对侧相对本侧的几何变换
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MappedTransform {
    /// 无变换
    None,
    /// 未给定时的无变换
    DefaultNone,
    /// 平移：对侧点 = 本侧点 + separation
    Translational { separation: Vector },
}

impl MappedTransform {
    /// 把对侧坐标变回本侧
    pub fn invert_position(&self, p: Vector) -> Vector {
        match self {
            MappedTransform::Translational { separation } => p - *separation,
            _ => p,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            MappedTransform::None => "none",
            MappedTransform::DefaultNone => "defaultNone",
            MappedTransform::Translational { .. } => "translational",
        }
    }
}

/// 网格移动后的重新求交策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MoveUpdate {
    /// 每次移动都重新求交
    #[default]
    Always,
    /// 补丁点变化时重新求交
    Detect,
    /// 从不重新求交
    Never,
}

impl MoveUpdate {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveUpdate::Always => "always",
            MoveUpdate::Detect => "detect",
            MoveUpdate::Never => "never",
        }
    }
}

impl FromStr for MoveUpdate {
    type Err = FvError;

    fn from_str(s: &str) -> FvResult<Self> {
        match s {
            "always" => Ok(MoveUpdate::Always),
            "detect" => Ok(MoveUpdate::Detect),
            "never" => Ok(MoveUpdate::Never),
            other => Err(FvError::unknown_type(
                "moveUpdate",
                other,
                vec!["always".into(), "detect".into(), "never".into()],
            )),
        }
    }
}

impl fmt::Display for MoveUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 映射补丁配置
#[derive(Debug, Clone, PartialEq)]
pub struct MappedPatchBase {
    patch_name: String,
    neighbour_region: String,
    neighbour_patch: String,
    couple_group: Option<String>,
    transform: MappedTransform,
    move_update: MoveUpdate,
    method: String,
}

impl MappedPatchBase {
    /// 同区域映射到 `neighbour_patch`
    pub fn new(patch_name: impl Into<String>, neighbour_patch: impl Into<String>) -> Self {
        Self {
            patch_name: patch_name.into(),
            neighbour_region: DEFAULT_REGION.into(),
            neighbour_patch: neighbour_patch.into(),
            couple_group: None,
            transform: MappedTransform::DefaultNone,
            move_update: MoveUpdate::default(),
            method: "intersection".into(),
        }
    }

    pub fn with_transform(mut self, transform: MappedTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_move_update(mut self, move_update: MoveUpdate) -> Self {
        self.move_update = move_update;
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// 字典是否给出了对侧信息
    pub fn specified(dict: &Dictionary) -> bool {
        dict.found("neighbourPatch") || dict.found("coupleGroup")
    }

    /// 从字典读取；`coupleGroup` 在网格中查找同组的另一补丁
    pub fn from_dict(patch_name: &str, dict: &Dictionary, mesh: &FvMesh) -> FvResult<Self> {
        let neighbour_region: String = dict.lookup_or_default("neighbourRegion", DEFAULT_REGION.to_string())?;

        let (neighbour_patch, couple_group) = if dict.found("neighbourPatch") {
            (dict.lookup::<String>("neighbourPatch")?, None)
        } else if dict.found("coupleGroup") {
            let group: String = dict.lookup("coupleGroup")?;
            let other = mesh
                .poly()
                .patches_in_group(&group)
                .into_iter()
                .map(|i| mesh.patch(i).name().to_string())
                .find(|name| name != patch_name)
                .ok_or_else(|| {
                    FvError::invalid_entry(
                        dict.name(),
                        "coupleGroup",
                        group.clone(),
                        "耦合组中没有其他补丁",
                    )
                })?;
            (other, Some(group))
        } else {
            return Err(FvError::missing_entry(dict.name(), "neighbourPatch"));
        };

        let transform_type: String = dict.lookup_or_default("transformType", "defaultNone".to_string())?;
        let transform = match transform_type.as_str() {
            "none" => MappedTransform::None,
            "defaultNone" => MappedTransform::DefaultNone,
            "translational" => MappedTransform::Translational {
                separation: dict.lookup("separation")?,
            },
            other => {
                return Err(FvError::unknown_type(
                    "transformType",
                    other,
                    vec!["defaultNone".into(), "none".into(), "translational".into()],
                ))
            }
        };

        let move_update: String = dict.lookup_or_default("moveUpdate", "always".to_string())?;
        let method: String = dict.lookup_or_default("method", "intersection".to_string())?;

        Ok(Self {
            patch_name: patch_name.to_string(),
            neighbour_region,
            neighbour_patch,
            couple_group,
            transform,
            move_update: move_update.parse()?,
            method,
        })
    }

    // =========================================================================
    // 查询
    // =========================================================================

    #[inline]
    pub fn patch_name(&self) -> &str {
        &self.patch_name
    }

    #[inline]
    pub fn neighbour_region(&self) -> &str {
        &self.neighbour_region
    }

    #[inline]
    pub fn neighbour_patch(&self) -> &str {
        &self.neighbour_patch
    }

    #[inline]
    pub fn transform(&self) -> MappedTransform {
        self.transform
    }

    #[inline]
    pub fn move_update(&self) -> MoveUpdate {
        self.move_update
    }

    /// 耦合方法名
    #[inline]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// 是否同区域
    pub fn same_region(&self) -> bool {
        self.neighbour_region == DEFAULT_REGION
    }

    /// 是否映射到自身
    pub fn same_patch(&self) -> bool {
        self.same_region() && self.neighbour_patch == self.patch_name
    }

    /// 检查映射是否可用于当前网格
    pub fn validate_for(&self, mesh: &FvMesh, allow_same_patch: bool) -> FvResult<usize> {
        if !self.same_region() {
            return Err(FvError::not_implemented(format!(
                "补丁 {} 映射到其他区域 {}",
                self.patch_name, self.neighbour_region
            )));
        }
        if self.same_patch() && !allow_same_patch {
            return Err(FvError::invalid_entry(
                &self.patch_name,
                "neighbourPatch",
                &self.neighbour_patch,
                "不能映射到自身",
            ));
        }
        mesh.poly().patch_index(&self.neighbour_patch)
    }

    /// 对侧补丁面，已变换回本侧坐标
    pub fn neighbour_faces(&self, mesh: &FvMesh) -> FvResult<PrimitivePatch> {
        let nbr = self.validate_for(mesh, true)?;
        let patch = PrimitivePatch::from_patch(mesh.poly(), nbr);
        Ok(match self.transform {
            MappedTransform::Translational { separation } => patch.translated(-separation),
            _ => patch,
        })
    }

    /// 网格移动后是否需要重新求交
    pub fn moving(&self, old: &FvMesh, new: &FvMesh) -> FvResult<bool> {
        Ok(match self.move_update {
            MoveUpdate::Always => true,
            MoveUpdate::Never => false,
            MoveUpdate::Detect => {
                let own = old.poly().patch_index(&self.patch_name)?;
                let nbr = self.validate_for(old, true)?;
                [own, nbr].iter().any(|&p| {
                    PrimitivePatch::from_patch(old.poly(), p).points()
                        != PrimitivePatch::from_patch(new.poly(), p).points()
                })
            }
        })
    }

    /// 写出配置条目
    pub fn write(&self, os: &mut OStream) {
        if self.neighbour_region != DEFAULT_REGION {
            os.write_entry("neighbourRegion", &self.neighbour_region);
        }
        match &self.couple_group {
            Some(group) => os.write_entry("coupleGroup", group),
            None => os.write_entry("neighbourPatch", &self.neighbour_patch),
        }
        if self.transform != MappedTransform::DefaultNone {
            os.write_entry("transformType", self.transform.type_name());
        }
        if let MappedTransform::Translational { separation } = self.transform {
            let text = os.format_value(&separation);
            os.write_entry("separation", &text);
        }
        os.write_entry("moveUpdate", self.move_update.as_str());
        os.write_entry("method", &self.method);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_foundation::Precision;
    use fv_mesh::{BoxMeshBuilder, BoxSide, PatchKind};

    fn mesh() -> FvMesh {
        let poly = BoxMeshBuilder::new(3, 2, 1, 3.0, 2.0, 1.0)
            .with_patch(BoxSide::XMin, "inlet", PatchKind::Mapped)
            .with_patch(BoxSide::XMax, "outlet", PatchKind::Patch)
            .build()
            .unwrap();
        FvMesh::new(poly).unwrap()
    }

    #[test]
    fn test_from_dict_and_write_round_trip() {
        let mesh = mesh();
        let dict = Dictionary::parse(
            "inlet",
            "neighbourPatch outlet; transformType translational; separation (3 0 0); moveUpdate detect;",
        )
        .unwrap();
        assert!(MappedPatchBase::specified(&dict));
        let base = MappedPatchBase::from_dict("inlet", &dict, &mesh).unwrap();
        assert_eq!(base.move_update(), MoveUpdate::Detect);
        assert!(base.same_region() && !base.same_patch());

        let mut os = OStream::new(Precision::default());
        base.write(&mut os);
        let back = MappedPatchBase::from_dict("inlet", &Dictionary::parse("inlet", os.as_str()).unwrap(), &mesh)
            .unwrap();
        assert_eq!(back, base);

        // 对侧补丁平移回本侧后与本侧重合
        let faces = base.neighbour_faces(&mesh).unwrap();
        for c in faces.face_centres() {
            assert!(c.x.abs() < 1e-12);
        }
    }

    #[test]
    fn test_validation() {
        let mesh = mesh();
        let same = MappedPatchBase::new("inlet", "inlet");
        assert!(same.validate_for(&mesh, false).is_err());
        assert!(same.validate_for(&mesh, true).is_ok());
        let missing = Dictionary::parse("inlet", "moveUpdate never;").unwrap();
        assert!(matches!(
            MappedPatchBase::from_dict("inlet", &missing, &mesh),
            Err(FvError::MissingEntry { .. })
        ));
        let bad = Dictionary::parse("inlet", "neighbourPatch outlet; moveUpdate sometimes;").unwrap();
        assert!(MappedPatchBase::from_dict("inlet", &bad, &mesh).is_err());
    }

    #[test]
    fn test_detect_moving() {
        let mesh = mesh();
        let base = MappedPatchBase::new("inlet", "outlet").with_move_update(MoveUpdate::Detect);
        let same = mesh.moved(mesh.poly().points().to_vec()).unwrap();
        assert!(!base.moving(&mesh, &same).unwrap());
        let shifted: Vec<Vector> = mesh.poly().points().iter().map(|p| *p * 1.1).collect();
        let moved = mesh.moved(shifted).unwrap();
        assert!(base.moving(&mesh, &moved).unwrap());
        let never = base.clone().with_move_update(MoveUpdate::Never);
        assert!(!never.moving(&mesh, &moved).unwrap());
    }
}
