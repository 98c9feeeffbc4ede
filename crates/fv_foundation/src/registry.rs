// crates/fv_foundation/src/registry.rs

//! 运行时类型选择注册表
//!
//! 每个模型族（边界条件、耦合方法、重编号方法、湍流模型……）在启动时
//! 构造一个 [`Registry`]，把类型名映射到构造器，然后以引用方式传给需要
//! 按名称构造对象的代码。注册表是普通的值对象，不存在全局可变状态。

use crate::error::{FvError, FvResult};
use std::collections::HashMap;

/// 名称到构造器的映射
#[derive(Debug, Clone)]
pub struct Registry<C> {
    /// 模型族名称（用于错误信息）
    family: String,
    /// 已注册的构造器
    entries: Vec<(String, C)>,
    /// 名称到索引的映射
    name_index: HashMap<String, usize>,
}

impl<C> Registry<C> {
    /// 创建空注册表
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            entries: Vec::new(),
            name_index: HashMap::new(),
        }
    }

    /// 模型族名称
    #[inline]
    pub fn family(&self) -> &str {
        &self.family
    }

    /// 注册构造器；同名时替换旧的构造器
    pub fn register(&mut self, name: impl Into<String>, ctor: C) -> &mut Self {
        let name = name.into();
        if let Some(&idx) = self.name_index.get(&name) {
            self.entries[idx].1 = ctor;
        } else {
            self.name_index.insert(name.clone(), self.entries.len());
            self.entries.push((name, ctor));
        }
        self
    }

    /// 按名称查找构造器；未知名称返回列出全部可选类型的错误
    pub fn lookup(&self, name: &str) -> FvResult<&C> {
        match self.name_index.get(name) {
            Some(&idx) => Ok(&self.entries[idx].1),
            None => Err(FvError::unknown_type(
                &self.family,
                name,
                self.names().into_iter().map(String::from).collect(),
            )),
        }
    }

    /// 是否已注册
    pub fn contains(&self, name: &str) -> bool {
        self.name_index.contains_key(name)
    }

    /// 按字母序排列的全部名称
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.iter().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// 注册数量
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double(x: f64) -> f64 {
        2.0 * x
    }

    fn triple(x: f64) -> f64 {
        3.0 * x
    }

    #[test]
    fn test_register_and_lookup() {
        let mut reg: Registry<fn(f64) -> f64> = Registry::new("缩放");
        reg.register("double", double).register("triple", triple);
        assert_eq!((reg.lookup("triple").unwrap())(2.0), 6.0);
        assert_eq!(reg.names(), vec!["double", "triple"]);
    }

    #[test]
    fn test_unknown_name_lists_valid() {
        let mut reg: Registry<fn(f64) -> f64> = Registry::new("缩放");
        reg.register("double", double);
        match reg.lookup("quadruple") {
            Err(FvError::UnknownType { name, valid, .. }) => {
                assert_eq!(name, "quadruple");
                assert_eq!(valid, vec!["double".to_string()]);
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_reregister_replaces() {
        let mut reg: Registry<fn(f64) -> f64> = Registry::new("缩放");
        reg.register("f", double).register("f", triple);
        assert_eq!(reg.len(), 1);
        assert_eq!((reg.lookup("f").unwrap())(1.0), 3.0);
    }
}
