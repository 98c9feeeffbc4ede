// crates/fv_models/src/soot.rs

//! # 碳烟模型
//!
//! `mixtureFraction` 为纯状态模型：单步反应
//! `νf Fuel + νOx Ox = νP P + νSoot soot` 给出化学计量下的最大碳烟质量分数，
//! 空间分布取映射组分（缺省为第一个产物）的归一化质量分数。
//!
//! ```text
//! sootModel mixtureFraction;
//! mixtureFractionCoeffs
//! {
//!     nuSoot          0.015;
//!     Wsoot           12;
//!     mappingField    CO2;
//!     products        ((CO2 1 44.01) (H2O 2 18.015));
//! }
//! ```

use crate::field_ops::map;
use fv_core::fields::patch_types;
use fv_core::{FvMesh, GeometricField, VolScalarField};
use fv_foundation::dimension::DIMLESS;
use fv_foundation::token::TokenCursor;
use fv_foundation::{Dictionary, FromTokens, FvError, FvResult, Registry};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// 接口
// ============================================================================

pub trait SootModel: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &'static str;

    /// 碳烟质量分数，无碳烟模型时为 `None`
    fn soot(&self) -> Option<&VolScalarField>;

    /// 以当前组分场更新
    fn correct(&mut self, species: &[VolScalarField]) -> FvResult<()>;
}

pub type SootConstructor = fn(&Dictionary, &Arc<FvMesh>) -> FvResult<Box<dyn SootModel>>;

pub type SootRegistry = Registry<SootConstructor>;

pub fn soot_registry() -> SootRegistry {
    let mut registry = SootRegistry::new("sootModel");
    registry
        .register("none", NoSoot::from_dict as SootConstructor)
        .register("mixtureFraction", MixtureFraction::from_dict as SootConstructor);
    registry
}

/// 按 `sootModel` 选择，缺省为 `none`
pub fn new_soot_model(dict: &Dictionary, mesh: &Arc<FvMesh>, registry: &SootRegistry) -> FvResult<Box<dyn SootModel>> {
    let type_name: String = dict.lookup_or_default("sootModel", "none".to_string())?;
    let ctor = registry.lookup(&type_name)?;
    tracing::info!(model = %type_name, "选择碳烟模型");
    ctor(dict.optional_sub_dict(&format!("{type_name}Coeffs")), mesh)
}

#[derive(Debug, Clone, Default)]
pub struct NoSoot;

impl NoSoot {
    pub fn from_dict(_dict: &Dictionary, _mesh: &Arc<FvMesh>) -> FvResult<Box<dyn SootModel>> {
        Ok(Box::new(Self))
    }
}

impl SootModel for NoSoot {
    fn type_name(&self) -> &'static str {
        "none"
    }

    fn soot(&self) -> Option<&VolScalarField> {
        None
    }

    fn correct(&mut self, _species: &[VolScalarField]) -> FvResult<()> {
        Ok(())
    }
}

// ============================================================================
// mixtureFraction
// ============================================================================

/// 单步反应的产物：`(name nu W)`
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionProduct {
    pub name: String,
    /// 化学计量系数
    pub nu: f64,
    /// 摩尔质量 [kg/kmol]
    pub w: f64,
}

impl FromTokens for ReactionProduct {
    fn read_tokens(cursor: &mut TokenCursor<'_>) -> Result<Self, String> {
        cursor.expect_punct('(')?;
        let name = cursor.next_word()?;
        let nu = cursor.next_number()?;
        let w = cursor.next_number()?;
        cursor.expect_punct(')')?;
        Ok(Self { name, nu, w })
    }
}

#[derive(Debug, Clone)]
pub struct MixtureFraction {
    soot: VolScalarField,
    nu_soot: f64,
    w_soot: f64,
    soot_max: f64,
    mapping_field: String,
    map_field_max: f64,
}

impl MixtureFraction {
    pub fn new(
        mesh: Arc<FvMesh>,
        products: &[ReactionProduct],
        nu_soot: f64,
        w_soot: f64,
        mapping_field: Option<String>,
    ) -> FvResult<Self> {
        let context = "mixtureFractionCoeffs";
        let first = products
            .first()
            .ok_or_else(|| FvError::missing_entry(context, "products"))?;
        let mapping_field = mapping_field.unwrap_or_else(|| first.name.clone());
        let mapped = products
            .iter()
            .find(|p| p.name == mapping_field)
            .ok_or_else(|| FvError::invalid_entry(context, "mappingField", &mapping_field, "不是反应产物"))?;

        let total_mol = products.iter().map(|p| p.nu.abs()).sum::<f64>() + nu_soot;
        let x_soot = nu_soot / total_mol;
        let wm = products.iter().map(|p| p.nu.abs() / total_mol * p.w).sum::<f64>() + x_soot * w_soot;
        let soot_max = x_soot * w_soot / wm;

        let product_mass: f64 = products.iter().map(|p| p.nu.abs() * p.w).sum();
        let map_field_max = mapped.nu.abs() * mapped.w / product_mass;
        if !(map_field_max > 0.0) {
            return Err(FvError::invalid_entry(
                context,
                "products",
                map_field_max.to_string(),
                "映射组分的最大质量分数必须为正",
            ));
        }

        tracing::debug!(soot_max, map_field_max, mapping = %mapping_field, "碳烟最大质量分数");
        let types = patch_types(&mesh, "zeroGradient");
        let soot = GeometricField::new("soot", mesh, DIMLESS, &types)?;
        Ok(Self {
            soot,
            nu_soot,
            w_soot,
            soot_max,
            mapping_field,
            map_field_max,
        })
    }

    pub fn from_dict(dict: &Dictionary, mesh: &Arc<FvMesh>) -> FvResult<Box<dyn SootModel>> {
        let nu_soot = dict.lookup("nuSoot")?;
        let w_soot = dict.lookup("Wsoot")?;
        let mapping_field = if dict.found("mappingField") {
            Some(dict.lookup("mappingField")?)
        } else {
            None
        };
        let products: Vec<ReactionProduct> = dict.lookup("products")?;
        Ok(Box::new(Self::new(
            Arc::clone(mesh),
            &products,
            nu_soot,
            w_soot,
            mapping_field,
        )?))
    }

    #[inline]
    pub fn soot_max(&self) -> f64 {
        self.soot_max
    }

    #[inline]
    pub fn map_field_max(&self) -> f64 {
        self.map_field_max
    }

    #[inline]
    pub fn mapping_field(&self) -> &str {
        &self.mapping_field
    }

    #[inline]
    pub fn nu_soot(&self) -> f64 {
        self.nu_soot
    }

    #[inline]
    pub fn w_soot(&self) -> f64 {
        self.w_soot
    }
}

impl SootModel for MixtureFraction {
    fn type_name(&self) -> &'static str {
        "mixtureFraction"
    }

    fn soot(&self) -> Option<&VolScalarField> {
        Some(&self.soot)
    }

    fn correct(&mut self, species: &[VolScalarField]) -> FvResult<()> {
        let y = species
            .iter()
            .find(|f| f.name() == self.mapping_field)
            .ok_or_else(|| FvError::not_stored(&self.mapping_field, "组分场"))?;
        let scale = self.soot_max / self.map_field_max;
        let soot = map("soot", y, DIMLESS, |y| scale * y)?;
        self.soot.force_assign(&soot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_foundation::Dimensioned;
    use fv_mesh::BoxMeshBuilder;

    const COEFFS: &str = "
        sootModel mixtureFraction;
        mixtureFractionCoeffs
        {
            nuSoot      0.015;
            Wsoot       12;
            products    ((CO2 1 44) (H2O 2 18));
        }
    ";

    fn mesh() -> Arc<FvMesh> {
        Arc::new(FvMesh::new(BoxMeshBuilder::cube(2, 1.0).build().unwrap()).unwrap())
    }

    #[test]
    fn test_soot_max_from_products() {
        let products = vec![
            ReactionProduct { name: "CO2".into(), nu: 1.0, w: 44.0 },
            ReactionProduct { name: "H2O".into(), nu: 2.0, w: 18.0 },
        ];
        let model = MixtureFraction::new(mesh(), &products, 0.015, 12.0, None).unwrap();
        assert_eq!(model.mapping_field(), "CO2");

        let total = 3.015;
        let wm = (44.0 + 2.0 * 18.0 + 0.015 * 12.0) / total;
        let expected = 0.015 / total * 12.0 / wm;
        assert!((model.soot_max() - expected).abs() < 1e-14);
        assert!((model.map_field_max() - 44.0 / 80.0).abs() < 1e-14);
    }

    #[test]
    fn test_soot_follows_mapping_field() {
        let dict = Dictionary::parse("radiationProperties", COEFFS).unwrap();
        let mesh = mesh();
        let mut model = new_soot_model(&dict, &mesh, &soot_registry()).unwrap();
        let types = patch_types(&mesh, "zeroGradient");
        let y = GeometricField::uniform("CO2", Arc::clone(&mesh), &Dimensioned::new("Y", DIMLESS, 0.275), &types)
            .unwrap();
        model.correct(&[y]).unwrap();

        let soot = model.soot().unwrap();
        let products = vec![
            ReactionProduct { name: "CO2".into(), nu: 1.0, w: 44.0 },
            ReactionProduct { name: "H2O".into(), nu: 2.0, w: 18.0 },
        ];
        let reference = MixtureFraction::new(mesh, &products, 0.015, 12.0, None).unwrap();
        let expected = reference.soot_max() * 0.5;
        assert!(soot.primitive_field().iter().all(|&s| (s - expected).abs() < 1e-14));
    }

    #[test]
    fn test_missing_mapping_species() {
        let dict = Dictionary::parse("radiationProperties", COEFFS).unwrap();
        let mut model = new_soot_model(&dict, &mesh(), &soot_registry()).unwrap();
        assert!(matches!(model.correct(&[]), Err(FvError::NotStored { .. })));
    }

    #[test]
    fn test_mapping_field_must_be_product() {
        let dict = Dictionary::parse(
            "c",
            "nuSoot 0.01; Wsoot 12; mappingField N2; products ((CO2 1 44));",
        )
        .unwrap();
        assert!(MixtureFraction::from_dict(&dict, &mesh()).is_err());
    }

    #[test]
    fn test_default_is_none() {
        let dict = Dictionary::parse("radiationProperties", "").unwrap();
        let model = new_soot_model(&dict, &mesh(), &soot_registry()).unwrap();
        assert!(model.soot().is_none());
    }
}
