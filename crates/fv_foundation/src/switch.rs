// crates/fv_foundation/src/switch.rs

//! 开关量解析
//!
//! 字典中的布尔值可以写成多种形式：`false/true`、`off/on`、`no/yes`、
//! `n/y`、`f/t`、`none/any`。名称按“假/真”成对排列，布尔值取名称序号的最低位。

use crate::dictionary::Dictionary;
use crate::error::{FvError, FvResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 开关量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Switch {
    False = 0,
    True = 1,
    Off = 2,
    On = 3,
    No = 4,
    Yes = 5,
    N = 6,
    Y = 7,
    F = 8,
    T = 9,
    None = 10,
    Any = 11,
    /// 无法识别的文本（仅在允许时产生）
    Invalid = 12,
}

/// 按枚举序号排列的名称
const NAMES: [&str; 13] = [
    "false", "true", "off", "on", "no", "yes", "n", "y", "f", "t", "none", "any", "invalid",
];

const VARIANTS: [Switch; 13] = [
    Switch::False,
    Switch::True,
    Switch::Off,
    Switch::On,
    Switch::No,
    Switch::Yes,
    Switch::N,
    Switch::Y,
    Switch::F,
    Switch::T,
    Switch::None,
    Switch::Any,
    Switch::Invalid,
];

impl Switch {
    /// 解析文本；`allow_invalid` 为真时无法识别的文本返回 [`Switch::Invalid`]
    pub fn parse(text: &str, allow_invalid: bool) -> FvResult<Self> {
        // 最后一个名称 "invalid" 不参与匹配
        if let Some(i) = NAMES[..NAMES.len() - 1].iter().position(|n| *n == text) {
            return Ok(VARIANTS[i]);
        }
        if allow_invalid {
            Ok(Switch::Invalid)
        } else {
            Err(FvError::invalid_entry(
                "switch",
                "value",
                text,
                format!("可接受的开关量: {:?}", &NAMES[..NAMES.len() - 1]),
            ))
        }
    }

    /// 由布尔值构造（`false`/`true`）
    pub fn from_bool(b: bool) -> Self {
        if b {
            Switch::True
        } else {
            Switch::False
        }
    }

    /// 布尔值：名称序号的最低位
    #[inline]
    pub fn as_bool(&self) -> bool {
        (*self as usize) & 0x1 == 1
    }

    /// 是否为可识别的开关量
    #[inline]
    pub fn valid(&self) -> bool {
        *self != Switch::Invalid
    }

    /// 文本名称
    #[inline]
    pub fn as_text(&self) -> &'static str {
        NAMES[*self as usize]
    }

    /// 字典中存在该键时读取并返回 `Some`
    pub fn read_if_present(key: &str, dict: &Dictionary) -> FvResult<Option<Self>> {
        if dict.found(key) {
            dict.lookup::<Switch>(key).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl From<Switch> for bool {
    fn from(s: Switch) -> bool {
        s.as_bool()
    }
}

impl From<bool> for Switch {
    fn from(b: bool) -> Self {
        Switch::from_bool(b)
    }
}

impl FromStr for Switch {
    type Err = FvError;

    fn from_str(s: &str) -> FvResult<Self> {
        Switch::parse(s, false)
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_text())
    }
}

impl Serialize for Switch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_text())
    }
}

impl<'de> Deserialize<'de> for Switch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Switch::parse(&text, false).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_map_to_bool() {
        for (i, name) in NAMES[..12].iter().enumerate() {
            let s = Switch::parse(name, false).unwrap();
            assert_eq!(s.as_bool(), i % 2 == 1, "{name}");
            assert_eq!(s.as_text(), *name);
        }
    }

    #[test]
    fn test_invalid_text() {
        assert!(Switch::parse("maybe", false).is_err());
        let s = Switch::parse("maybe", true).unwrap();
        assert!(!s.valid());
        // "invalid" 本身也不是合法输入
        assert!(Switch::parse("invalid", false).is_err());
    }

    #[test]
    fn test_serde_as_text() {
        let json = serde_json::to_string(&Switch::On).unwrap();
        assert_eq!(json, "\"on\"");
        let back: Switch = serde_json::from_str("\"yes\"").unwrap();
        assert!(back.as_bool());
    }
}
