// crates/fv_models/src/lib.rs

//! 物理模型
//!
//! 建立在有限体积核心上的消费者模型，全部经注册表按名称构造。
//!
//! # 模块结构
//!
//! - [`function1`]: 一元函数族（常数、表格、斜坡、归一化、NSRDS 多项式）
//! - [`turbulence`]: 动量输运模型，含 LRR 雷诺应力模型与壁面距离
//! - [`drift_flux`]: 漂移通量混合物的相对速度与堆积扩散
//! - [`laminar_flame_speed`]: 层流火焰速度
//! - [`soot`]: 混合分数碳烟模型
//! - [`field_ops`]: 逐点派生场的辅助函数
//!
//! # 示例
//!
//! ```rust
//! use fv_foundation::Dictionary;
//! use fv_models::function1::{function1_registry, new_function1};
//!
//! let dict = Dictionary::parse("controls", "ramp { type linearRamp; start 0; duration 2; }").unwrap();
//! let ramp = new_function1("ramp", &dict, &function1_registry()).unwrap();
//! assert_eq!(ramp.value(1.0), 0.5);
//! assert_eq!(ramp.integral(0.0, 2.0), 1.0);
//! ```

pub mod drift_flux;
pub mod field_ops;
pub mod function1;
pub mod laminar_flame_speed;
pub mod soot;
pub mod turbulence;

use drift_flux::{
    packing_dispersion_registry, relative_velocity_registry, PackingDispersionRegistry, RelativeVelocityRegistry,
};
use function1::{function1_registry, Function1Registry};
use laminar_flame_speed::{laminar_flame_speed_registry, LaminarFlameSpeedRegistry};
use soot::{soot_registry, SootRegistry};
use turbulence::{momentum_transport_registry, MomentumTransportRegistry};

/// 内置模型注册表集合
#[derive(Debug)]
pub struct ModelRegistries {
    pub function1: Function1Registry,
    pub momentum_transport: MomentumTransportRegistry,
    pub relative_velocity: RelativeVelocityRegistry,
    pub packing_dispersion: PackingDispersionRegistry,
    pub laminar_flame_speed: LaminarFlameSpeedRegistry,
    pub soot: SootRegistry,
}

impl Default for ModelRegistries {
    fn default() -> Self {
        Self {
            function1: function1_registry(),
            momentum_transport: momentum_transport_registry(),
            relative_velocity: relative_velocity_registry(),
            packing_dispersion: packing_dispersion_registry(),
            laminar_flame_speed: laminar_flame_speed_registry(),
            soot: soot_registry(),
        }
    }
}

impl ModelRegistries {
    /// 各族名称与已注册类型
    pub fn families(&self) -> Vec<(&str, Vec<&str>)> {
        vec![
            (self.function1.family(), self.function1.names()),
            (self.momentum_transport.family(), self.momentum_transport.names()),
            (self.relative_velocity.family(), self.relative_velocity.names()),
            (self.packing_dispersion.family(), self.packing_dispersion.names()),
            (self.laminar_flame_speed.family(), self.laminar_flame_speed.names()),
            (self.soot.family(), self.soot.names()),
        ]
    }
}
