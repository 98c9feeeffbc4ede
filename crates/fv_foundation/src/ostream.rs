// crates/fv_foundation/src/ostream.rs

//! 格式化输出流
//!
//! 与字典文本格式配套的写出器：维护缩进层级、按固定列宽对齐关键字、
//! 控制浮点数的输出精度。

use crate::value::FieldValue;
use std::fmt::Write as _;

/// 关键字列宽
const ENTRY_INDENTATION: usize = 16;

/// 浮点数输出精度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// 保留给定位数的有效数字（`%g` 风格）
    Significant(usize),
    /// 最短的可精确回读表示
    Exact,
}

impl Default for Precision {
    fn default() -> Self {
        Precision::Significant(6)
    }
}

/// 文本输出流
#[derive(Debug, Clone)]
pub struct OStream {
    buf: String,
    indent_level: usize,
    indent_size: usize,
    precision: Precision,
}

impl Default for OStream {
    fn default() -> Self {
        Self::new(Precision::default())
    }
}

impl OStream {
    /// 创建输出流
    pub fn new(precision: Precision) -> Self {
        Self {
            buf: String::new(),
            indent_level: 0,
            indent_size: 4,
            precision,
        }
    }

    /// 当前精度
    #[inline]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// 设置精度，返回旧值
    pub fn set_precision(&mut self, precision: Precision) -> Precision {
        std::mem::replace(&mut self.precision, precision)
    }

    /// 写入当前缩进
    pub fn indent(&mut self) {
        for _ in 0..self.indent_level * self.indent_size {
            self.buf.push(' ');
        }
    }

    /// 增加缩进
    #[inline]
    pub fn inc_indent(&mut self) {
        self.indent_level += 1;
    }

    /// 减少缩进
    #[inline]
    pub fn dec_indent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    /// 写入原始文本
    pub fn write_raw(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    /// 换行
    pub fn newline(&mut self) {
        self.buf.push('\n');
    }

    /// 写入关键字并对齐到值所在列
    pub fn write_keyword(&mut self, keyword: &str) {
        self.indent();
        self.buf.push_str(keyword);
        let pad = ENTRY_INDENTATION.saturating_sub(keyword.len()).max(1);
        for _ in 0..pad {
            self.buf.push(' ');
        }
    }

    /// 写入 `keyword value;` 条目
    pub fn write_entry(&mut self, keyword: &str, value: &str) {
        self.write_keyword(keyword);
        self.buf.push_str(value);
        self.buf.push_str(";\n");
    }

    /// 写入标量条目
    pub fn write_scalar_entry(&mut self, keyword: &str, value: f64) {
        let text = self.format_scalar(value);
        self.write_entry(keyword, &text);
    }

    /// 开始子字典块
    pub fn begin_block(&mut self, keyword: &str) {
        self.indent();
        self.buf.push_str(keyword);
        self.newline();
        self.indent();
        self.buf.push('{');
        self.newline();
        self.inc_indent();
    }

    /// 结束子字典块
    pub fn end_block(&mut self) {
        self.dec_indent();
        self.indent();
        self.buf.push('}');
        self.newline();
    }

    /// 按当前精度格式化浮点数
    pub fn format_scalar(&self, value: f64) -> String {
        format_scalar(value, self.precision)
    }

    /// 格式化场值：标量直接输出，多分量值输出为 `(a b c)`
    pub fn format_value<T: FieldValue>(&self, value: &T) -> String {
        if T::N_COMPONENTS == 1 {
            return self.format_scalar(value.component(0));
        }
        let mut s = String::from("(");
        for i in 0..T::N_COMPONENTS {
            if i > 0 {
                s.push(' ');
            }
            s.push_str(&self.format_scalar(value.component(i)));
        }
        s.push(')');
        s
    }

    /// 已写入的内容
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// 取出内容
    pub fn into_string(self) -> String {
        self.buf
    }
}

impl std::fmt::Write for OStream {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.buf.push_str(s);
        Ok(())
    }
}

/// 按精度格式化浮点数
pub fn format_scalar(value: f64, precision: Precision) -> String {
    if value.is_nan() {
        return "nan".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf".into() } else { "-inf".into() };
    }
    match precision {
        Precision::Exact => format_exact(value),
        Precision::Significant(digits) => format_general(value, digits.max(1)),
    }
}

/// 最短可回读表示，整数不带小数点
fn format_exact(value: f64) -> String {
    let s = format!("{value:?}");
    match s.strip_suffix(".0") {
        Some(int) => int.to_string(),
        None => s,
    }
}

/// `%g` 风格：指数小于 -4 或不小于有效位数时用科学计数法
fn format_general(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return "0".into();
    }
    let sci = format!("{:.*e}", digits - 1, value);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m.to_string(), e.parse::<i32>().unwrap_or(0)),
        None => (sci.clone(), 0),
    };
    if exp < -4 || exp >= digits as i32 {
        let mut out = trim_fraction(&mantissa);
        let _ = write!(out, "e{}{:02}", if exp < 0 { '-' } else { '+' }, exp.abs());
        out
    } else {
        let decimals = (digits as i32 - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value))
    }
}

fn trim_fraction(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Vector;

    #[test]
    fn test_general_format() {
        assert_eq!(format_scalar(1.0, Precision::Significant(6)), "1");
        assert_eq!(format_scalar(0.1, Precision::Significant(6)), "0.1");
        assert_eq!(format_scalar(123456789.0, Precision::Significant(6)), "1.23457e+08");
        assert_eq!(format_scalar(-2.5e-7, Precision::Significant(6)), "-2.5e-07");
        assert_eq!(format_scalar(1.0 / 3.0, Precision::Significant(6)), "0.333333");
    }

    #[test]
    fn test_exact_format_round_trips() {
        for v in [1.0 / 3.0, 1e-300, 6.02214076e23, -0.0, 42.0] {
            let s = format_scalar(v, Precision::Exact);
            assert_eq!(s.parse::<f64>().unwrap(), v);
        }
    }

    #[test]
    fn test_entry_alignment() {
        let mut os = OStream::default();
        os.begin_block("inlet");
        os.write_entry("type", "fixedValue");
        os.end_block();
        let text = os.into_string();
        assert!(text.contains("    type            fixedValue;"));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_format_vector() {
        let os = OStream::default();
        assert_eq!(os.format_value(&Vector::new(1.0, 0.0, -0.5)), "(1 0 -0.5)");
    }
}
