// crates/fv_foundation/src/dictionary.rs

//! 键值字典
//!
//! 模型系数、边界条件和场文件都使用同一种结构化文本格式：
//!
//! ```text
//! type            fixedValue;
//! value           uniform (1 0 0);
//! LRRCoeffs
//! {
//!     Cmu             0.09;
//! }
//! ```
//!
//! 条目要么是以 `;` 结束的词法单元序列，要么是 `{ }` 包围的子字典。
//! 类型化读取通过 [`FromTokens`] 完成；缺失的必需条目返回
//! [`FvError::MissingEntry`]，错误中带有字典的作用域名称（如
//! `T.boundaryField.inlet`）和键名。

use crate::dimension::{DimensionSet, Dimensioned};
use crate::error::{FvError, FvResult};
use crate::ostream::OStream;
use crate::switch::Switch;
use crate::tensor::{SymmTensor, Tensor, Vector};
use crate::token::{tokenize, tokens_to_string, Token, TokenCursor, TokenKind};
use crate::value::FieldValue;
use std::path::Path;

// ============================================================================
// 类型化读取
// ============================================================================

/// 从词法单元流读取值
pub trait FromTokens: Sized {
    /// 读取一个值，失败时返回原因
    fn read_tokens(cursor: &mut TokenCursor<'_>) -> Result<Self, String>;
}

/// 读取场值：标量为单个数字，其余为 `(c0 c1 ...)`
pub fn read_field_value<T: FieldValue>(cursor: &mut TokenCursor<'_>) -> Result<T, String> {
    if T::N_COMPONENTS == 1 {
        return Ok(T::splat(cursor.next_number()?));
    }
    cursor.expect_punct('(')?;
    let mut value = T::zero();
    for i in 0..T::N_COMPONENTS {
        value.set_component(i, cursor.next_number()?);
    }
    cursor.expect_punct(')')?;
    Ok(value)
}

impl FromTokens for f64 {
    fn read_tokens(cursor: &mut TokenCursor<'_>) -> Result<Self, String> {
        cursor.next_number()
    }
}

impl FromTokens for i64 {
    fn read_tokens(cursor: &mut TokenCursor<'_>) -> Result<Self, String> {
        let v = cursor.next_number()?;
        if v.fract() == 0.0 {
            Ok(v as i64)
        } else {
            Err(format!("期望整数, 实际 {v}"))
        }
    }
}

impl FromTokens for usize {
    fn read_tokens(cursor: &mut TokenCursor<'_>) -> Result<Self, String> {
        cursor.next_label()
    }
}

impl FromTokens for String {
    fn read_tokens(cursor: &mut TokenCursor<'_>) -> Result<Self, String> {
        cursor.next_word()
    }
}

impl FromTokens for Switch {
    fn read_tokens(cursor: &mut TokenCursor<'_>) -> Result<Self, String> {
        let word = cursor.next_word()?;
        Switch::parse(&word, false).map_err(|e| e.to_string())
    }
}

impl FromTokens for bool {
    fn read_tokens(cursor: &mut TokenCursor<'_>) -> Result<Self, String> {
        Switch::read_tokens(cursor).map(|s| s.as_bool())
    }
}

impl FromTokens for Vector {
    fn read_tokens(cursor: &mut TokenCursor<'_>) -> Result<Self, String> {
        read_field_value(cursor)
    }
}

impl FromTokens for SymmTensor {
    fn read_tokens(cursor: &mut TokenCursor<'_>) -> Result<Self, String> {
        read_field_value(cursor)
    }
}

impl FromTokens for Tensor {
    fn read_tokens(cursor: &mut TokenCursor<'_>) -> Result<Self, String> {
        read_field_value(cursor)
    }
}

impl FromTokens for DimensionSet {
    fn read_tokens(cursor: &mut TokenCursor<'_>) -> Result<Self, String> {
        cursor.expect_punct('[')?;
        let mut values = Vec::with_capacity(7);
        while !cursor.eat_punct(']') {
            values.push(cursor.next_number()?);
        }
        DimensionSet::from_slice(&values).map_err(|e| e.to_string())
    }
}

/// 列表：`(a b c)`、`N(a b c)` 或统一值 `N{a}`
impl<T: FromTokens + Clone> FromTokens for Vec<T> {
    fn read_tokens(cursor: &mut TokenCursor<'_>) -> Result<Self, String> {
        let size = match cursor.peek().map(|t| &t.kind) {
            Some(TokenKind::Number(_)) => Some(cursor.next_label()?),
            _ => None,
        };
        if let Some(n) = size {
            if cursor.eat_punct('{') {
                let v = T::read_tokens(cursor)?;
                cursor.expect_punct('}')?;
                return Ok(vec![v; n]);
            }
        }
        cursor.expect_punct('(')?;
        let mut items = Vec::with_capacity(size.unwrap_or(0));
        while !cursor.eat_punct(')') {
            if cursor.is_empty() {
                return Err("列表未闭合".into());
            }
            items.push(T::read_tokens(cursor)?);
        }
        if let Some(n) = size {
            if n != items.len() {
                return Err(format!("列表声明长度 {n}, 实际 {}", items.len()));
            }
        }
        Ok(items)
    }
}

/// 二元组：`(a b)`
impl<A: FromTokens, B: FromTokens> FromTokens for (A, B) {
    fn read_tokens(cursor: &mut TokenCursor<'_>) -> Result<Self, String> {
        cursor.expect_punct('(')?;
        let a = A::read_tokens(cursor)?;
        let b = B::read_tokens(cursor)?;
        cursor.expect_punct(')')?;
        Ok((a, b))
    }
}

// ============================================================================
// 字典
// ============================================================================

/// 字典条目
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// 以 `;` 结束的词法单元序列
    Stream(Vec<Token>),
    /// 子字典
    Dict(Dictionary),
}

/// 有序键值字典
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionary {
    name: String,
    entries: Vec<(String, Entry)>,
}

impl Dictionary {
    /// 创建空字典
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// 解析文本
    pub fn parse(name: impl Into<String>, text: &str) -> FvResult<Self> {
        let name = name.into();
        let tokens = tokenize(&name, text)?;
        let mut pos = 0;
        let dict = Self::parse_entries(name, &tokens, &mut pos, false)?;
        Ok(dict)
    }

    /// 读取字典文件，字典名取文件名
    pub fn read_file(path: impl AsRef<Path>) -> FvResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FvError::file_not_found(path));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| FvError::io_with_source(format!("读取 {}", path.display()), e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::parse(name, &text)
    }

    fn parse_entries(
        name: String,
        tokens: &[Token],
        pos: &mut usize,
        nested: bool,
    ) -> FvResult<Self> {
        let mut dict = Dictionary::new(name);
        loop {
            let Some(tok) = tokens.get(*pos) else {
                if nested {
                    let line = tokens.last().map(|t| t.line).unwrap_or(0);
                    return Err(FvError::parse(&dict.name, line, "子字典缺少 '}'"));
                }
                return Ok(dict);
            };
            if tok.is_punct('}') {
                if !nested {
                    return Err(FvError::parse(&dict.name, tok.line, "多余的 '}'"));
                }
                *pos += 1;
                return Ok(dict);
            }
            let key = match &tok.kind {
                TokenKind::Word(w) => w.clone(),
                TokenKind::Quoted(s) => s.clone(),
                _ => {
                    return Err(FvError::parse(
                        &dict.name,
                        tok.line,
                        format!("期望关键字, 实际 '{tok}'"),
                    ))
                }
            };
            *pos += 1;

            if tokens.get(*pos).map(|t| t.is_punct('{')).unwrap_or(false) {
                *pos += 1;
                let sub = Self::parse_entries(dict.scoped_name(&key), tokens, pos, true)?;
                dict.set(key, Entry::Dict(sub));
                continue;
            }

            let start = *pos;
            let mut depth = 0i32;
            loop {
                let Some(t) = tokens.get(*pos) else {
                    return Err(FvError::parse(
                        &dict.name,
                        tok.line,
                        format!("条目 '{key}' 缺少 ';'"),
                    ));
                };
                match t.kind {
                    TokenKind::Punct('(') | TokenKind::Punct('[') | TokenKind::Punct('{') => {
                        depth += 1
                    }
                    TokenKind::Punct(')') | TokenKind::Punct(']') | TokenKind::Punct('}') => {
                        depth -= 1;
                        if depth < 0 {
                            return Err(FvError::parse(
                                &dict.name,
                                t.line,
                                format!("条目 '{key}' 括号不匹配"),
                            ));
                        }
                    }
                    TokenKind::Punct(';') if depth == 0 => break,
                    _ => {}
                }
                *pos += 1;
            }
            let stream = tokens[start..*pos].to_vec();
            *pos += 1;
            dict.set(key, Entry::Stream(stream));
        }
    }

    // ------------------------------------------------------------------------
    // 基本访问
    // ------------------------------------------------------------------------

    /// 作用域名称
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 设置名称
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// 子条目的作用域名称
    pub fn scoped_name(&self, key: &str) -> String {
        if self.name.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.name, key)
        }
    }

    /// 条目数
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 所有键（保持插入顺序）
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// 是否存在该键
    pub fn found(&self, key: &str) -> bool {
        self.entry(key).is_some()
    }

    /// 查找条目
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    /// 该键是否为子字典
    pub fn is_dict(&self, key: &str) -> bool {
        matches!(self.entry(key), Some(Entry::Dict(_)))
    }

    /// 设置条目（已存在时覆盖）
    pub fn set(&mut self, key: impl Into<String>, entry: Entry) {
        let key = key.into();
        let entry = match entry {
            Entry::Dict(mut d) => {
                d.set_name(self.scoped_name(&key));
                Entry::Dict(d)
            }
            other => other,
        };
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = entry;
        } else {
            self.entries.push((key, entry));
        }
    }

    /// 由文本设置条目，如 `set_text("value", "uniform 1")`
    pub fn set_text(&mut self, key: impl Into<String>, text: &str) -> FvResult<()> {
        let key = key.into();
        let tokens = tokenize(&self.scoped_name(&key), text)?;
        self.set(key, Entry::Stream(tokens));
        Ok(())
    }

    /// 设置单词条目
    pub fn set_word(&mut self, key: impl Into<String>, word: &str) {
        self.set(key, Entry::Stream(vec![Token::word(word)]));
    }

    /// 设置数字条目
    pub fn set_scalar(&mut self, key: impl Into<String>, value: f64) {
        self.set(key, Entry::Stream(vec![Token::number(value)]));
    }

    /// 设置子字典
    pub fn set_dict(&mut self, key: impl Into<String>, dict: Dictionary) {
        self.set(key, Entry::Dict(dict));
    }

    /// 删除条目
    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    // ------------------------------------------------------------------------
    // 类型化读取
    // ------------------------------------------------------------------------

    /// 条目的词法单元
    pub fn tokens(&self, key: &str) -> FvResult<&[Token]> {
        match self.entry(key) {
            Some(Entry::Stream(t)) => Ok(t),
            Some(Entry::Dict(_)) => Err(FvError::invalid_entry(
                &self.name,
                key,
                "{ ... }",
                "期望值, 实际为子字典",
            )),
            None => Err(FvError::missing_entry(&self.name, key)),
        }
    }

    /// 读取必需条目
    pub fn lookup<T: FromTokens>(&self, key: &str) -> FvResult<T> {
        let tokens = self.tokens(key)?;
        self.read_stream(key, tokens)
    }

    /// 读取可选条目，缺失时返回默认值；存在但无效时仍然报错
    pub fn lookup_or_default<T: FromTokens>(&self, key: &str, default: T) -> FvResult<T> {
        if self.found(key) {
            self.lookup(key)
        } else {
            Ok(default)
        }
    }

    /// 存在时读取到 `target`，返回是否读取
    pub fn read_if_present<T: FromTokens>(&self, key: &str, target: &mut T) -> FvResult<bool> {
        if self.found(key) {
            *target = self.lookup(key)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// 从一段词法单元读取值并要求全部消费
    pub fn read_stream<T: FromTokens>(&self, key: &str, tokens: &[Token]) -> FvResult<T> {
        let mut cursor = TokenCursor::new(tokens);
        let value = T::read_tokens(&mut cursor).map_err(|reason| {
            FvError::invalid_entry(&self.name, key, tokens_to_string(tokens), reason)
        })?;
        if !cursor.is_empty() {
            return Err(FvError::invalid_entry(
                &self.name,
                key,
                tokens_to_string(tokens),
                format!("多余的内容: {}", tokens_to_string(cursor.remaining())),
            ));
        }
        Ok(value)
    }

    /// 读取带量纲的值
    ///
    /// 接受 `value`、`[dims] value` 或 `name [dims] value`；
    /// 给出的量纲与期望不符时返回量纲错误。
    pub fn lookup_dimensioned<T: FromTokens>(
        &self,
        key: &str,
        dimensions: DimensionSet,
    ) -> FvResult<Dimensioned<T>> {
        let tokens = self.tokens(key)?;
        let mut rest = tokens;
        if let Some(TokenKind::Word(_)) = rest.first().map(|t| &t.kind) {
            if rest.get(1).map(|t| t.is_punct('[')).unwrap_or(false) {
                rest = &rest[1..];
            }
        }
        if rest.first().map(|t| t.is_punct('[')).unwrap_or(false) {
            let close = rest
                .iter()
                .position(|t| t.is_punct(']'))
                .ok_or_else(|| {
                    FvError::invalid_entry(&self.name, key, tokens_to_string(tokens), "量纲未闭合")
                })?;
            let given: DimensionSet = self.read_stream(key, &rest[..=close])?;
            given.check_same(&dimensions, &self.scoped_name(key))?;
            rest = &rest[close + 1..];
        }
        let value = self.read_stream(key, rest)?;
        Ok(Dimensioned::new(key, dimensions, value))
    }

    /// 读取带量纲的值，缺失时使用默认值
    pub fn lookup_dimensioned_or_default<T: FromTokens>(
        &self,
        key: &str,
        dimensions: DimensionSet,
        default: T,
    ) -> FvResult<Dimensioned<T>> {
        if self.found(key) {
            self.lookup_dimensioned(key, dimensions)
        } else {
            Ok(Dimensioned::new(key, dimensions, default))
        }
    }

    /// 必需子字典
    pub fn sub_dict(&self, key: &str) -> FvResult<&Dictionary> {
        match self.entry(key) {
            Some(Entry::Dict(d)) => Ok(d),
            Some(Entry::Stream(t)) => Err(FvError::invalid_entry(
                &self.name,
                key,
                tokens_to_string(t),
                "期望子字典",
            )),
            None => Err(FvError::missing_entry(&self.name, key)),
        }
    }

    /// 可变子字典
    pub fn sub_dict_mut(&mut self, key: &str) -> FvResult<&mut Dictionary> {
        let name = self.name.clone();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, Entry::Dict(d))) => Ok(d),
            Some((_, Entry::Stream(t))) => Err(FvError::invalid_entry(
                name,
                key,
                tokens_to_string(t),
                "期望子字典",
            )),
            None => Err(FvError::missing_entry(name, key)),
        }
    }

    /// 子字典存在时返回它，否则返回自身（模型系数块的常见写法）
    pub fn optional_sub_dict(&self, key: &str) -> &Dictionary {
        match self.entry(key) {
            Some(Entry::Dict(d)) => d,
            _ => self,
        }
    }

    // ------------------------------------------------------------------------
    // 写出
    // ------------------------------------------------------------------------

    /// 写出全部条目
    pub fn write(&self, os: &mut OStream) {
        for (key, entry) in &self.entries {
            match entry {
                Entry::Stream(tokens) => {
                    let text = format_tokens(tokens, os);
                    os.write_entry(key, &text);
                }
                Entry::Dict(d) => {
                    os.begin_block(key);
                    d.write(os);
                    os.end_block();
                }
            }
        }
    }

    /// 以精确精度写出为文本
    pub fn to_text(&self) -> String {
        let mut os = OStream::new(crate::ostream::Precision::Exact);
        self.write(&mut os);
        os.into_string()
    }
}

/// 将词法单元格式化为紧凑文本：括号内侧不留空格
pub fn format_tokens(tokens: &[Token], os: &OStream) -> String {
    let mut out = String::new();
    let mut prev_open = true;
    for t in tokens {
        let closing = t.is_punct(')') || t.is_punct(']') || t.is_punct('}');
        if !prev_open && !closing {
            out.push(' ');
        }
        match &t.kind {
            TokenKind::Number(v) => out.push_str(&os.format_scalar(*v)),
            _ => out.push_str(&t.to_string()),
        }
        prev_open = t.is_punct('(') || t.is_punct('[') || t.is_punct('{');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::DIM_KINEMATIC_VISCOSITY;

    const SAMPLE: &str = r#"
        type            fixedValue;   // comment
        value           uniform (1 0 0);
        coeffs
        {
            Cmu             0.09;
            wallReflection  on;
            nu              nu [0 2 -1 0 0 0 0] 1e-05;
            table           ((0 1) (1 2.5));
        }
    "#;

    #[test]
    fn test_parse_and_lookup() {
        let dict = Dictionary::parse("U", SAMPLE).unwrap();
        assert_eq!(dict.lookup::<String>("type").unwrap(), "fixedValue");
        let coeffs = dict.sub_dict("coeffs").unwrap();
        assert_eq!(coeffs.name(), "U.coeffs");
        assert_eq!(coeffs.lookup::<f64>("Cmu").unwrap(), 0.09);
        assert!(coeffs.lookup::<bool>("wallReflection").unwrap());
        let table: Vec<(f64, f64)> = coeffs.lookup("table").unwrap();
        assert_eq!(table, vec![(0.0, 1.0), (1.0, 2.5)]);
    }

    #[test]
    fn test_missing_entry_carries_scope() {
        let dict = Dictionary::parse("U", SAMPLE).unwrap();
        let coeffs = dict.sub_dict("coeffs").unwrap();
        match coeffs.lookup::<f64>("C1") {
            Err(FvError::MissingEntry { dictionary, key }) => {
                assert_eq!(dictionary, "U.coeffs");
                assert_eq!(key, "C1");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(coeffs.lookup_or_default("C1", 1.8).unwrap(), 1.8);
    }

    #[test]
    fn test_nested_scope_joins_with_dots() {
        let dict = Dictionary::parse("T", "boundaryField { inlet { type fixedValue; } }").unwrap();
        let inlet = dict.sub_dict("boundaryField").unwrap().sub_dict("inlet").unwrap();
        assert_eq!(inlet.name(), "T.boundaryField.inlet");
        assert_eq!(inlet.scoped_name("value"), "T.boundaryField.inlet.value");
        assert_eq!(Dictionary::new("").scoped_name("value"), "value");
    }

    #[test]
    fn test_dimensioned_lookup() {
        let dict = Dictionary::parse("U", SAMPLE).unwrap();
        let coeffs = dict.sub_dict("coeffs").unwrap();
        let nu = coeffs
            .lookup_dimensioned::<f64>("nu", DIM_KINEMATIC_VISCOSITY)
            .unwrap();
        assert_eq!(nu.value, 1e-5);
        let wrong = coeffs.lookup_dimensioned::<f64>("nu", crate::dimension::DIM_LENGTH);
        assert!(matches!(wrong, Err(FvError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_trailing_garbage_is_error() {
        let dict = Dictionary::parse("d", "a 1 2;").unwrap();
        assert!(matches!(dict.lookup::<f64>("a"), Err(FvError::InvalidEntry { .. })));
    }

    #[test]
    fn test_sized_and_uniform_lists() {
        let dict = Dictionary::parse("d", "a 3(1 2 3); b 2{4};").unwrap();
        assert_eq!(dict.lookup::<Vec<f64>>("a").unwrap(), vec![1.0, 2.0, 3.0]);
        assert_eq!(dict.lookup::<Vec<f64>>("b").unwrap(), vec![4.0, 4.0]);
        let bad = Dictionary::parse("d", "a 2(1 2 3);").unwrap();
        assert!(bad.lookup::<Vec<f64>>("a").is_err());
    }

    #[test]
    fn test_missing_semicolon() {
        assert!(Dictionary::parse("d", "a 1").is_err());
        assert!(Dictionary::parse("d", "a { b 1; ").is_err());
    }

    #[test]
    fn test_write_then_parse() {
        let dict = Dictionary::parse("U", SAMPLE).unwrap();
        let text = dict.to_text();
        let back = Dictionary::parse("U", &text).unwrap();
        assert_eq!(
            back.sub_dict("coeffs").unwrap().lookup::<f64>("Cmu").unwrap(),
            0.09
        );
        assert!(back.lookup::<Vector>("value").is_err());
        assert!(text.contains("uniform (1 0 0);"));
    }

    #[test]
    fn test_optional_sub_dict_falls_back_to_self() {
        let dict = Dictionary::parse("model", "Cmu 0.1;").unwrap();
        let coeffs = dict.optional_sub_dict("LRRCoeffs");
        assert_eq!(coeffs.lookup::<f64>("Cmu").unwrap(), 0.1);
    }
}
