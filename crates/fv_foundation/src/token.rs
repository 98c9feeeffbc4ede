// crates/fv_foundation/src/token.rs

//! 字典文本的词法分析
//!
//! 词法单元只有四类：单词、数字、带引号字符串和分隔符 `{ } ( ) [ ] ;`。
//! 支持 `//` 行注释和 `/* */` 块注释。每个词法单元记录所在行号，
//! 以便解析错误能指出位置。

use crate::error::{FvError, FvResult};
use std::fmt;

/// 词法单元种类
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// 单词（关键字、类型名、`List<scalar>` 等）
    Word(String),
    /// 数字
    Number(f64),
    /// 带引号的字符串（不含引号）
    Quoted(String),
    /// 分隔符
    Punct(char),
}

/// 词法单元
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// 种类
    pub kind: TokenKind,
    /// 行号（从 1 开始）
    pub line: usize,
}

impl Token {
    /// 构造单词
    pub fn word(w: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Word(w.into()),
            line: 0,
        }
    }

    /// 构造数字
    pub fn number(v: f64) -> Self {
        Self {
            kind: TokenKind::Number(v),
            line: 0,
        }
    }

    /// 构造分隔符
    pub fn punct(c: char) -> Self {
        Self {
            kind: TokenKind::Punct(c),
            line: 0,
        }
    }

    /// 是否为给定分隔符
    #[inline]
    pub fn is_punct(&self, c: char) -> bool {
        matches!(self.kind, TokenKind::Punct(p) if p == c)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::Word(w) => write!(f, "{w}"),
            TokenKind::Number(v) => write!(f, "{v:?}"),
            TokenKind::Quoted(s) => write!(f, "\"{s}\""),
            TokenKind::Punct(c) => write!(f, "{c}"),
        }
    }
}

const PUNCTUATION: &[char] = &['{', '}', '(', ')', '[', ']', ';'];

/// 将文本切分为词法单元
pub fn tokenize(context: &str, text: &str) -> FvResult<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1usize;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        // 注释
        if c == '/' && i + 1 < chars.len() {
            if chars[i + 1] == '/' {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            if chars[i + 1] == '*' {
                let start_line = line;
                i += 2;
                loop {
                    if i + 1 >= chars.len() {
                        return Err(FvError::parse(context, start_line, "块注释未闭合"));
                    }
                    if chars[i] == '\n' {
                        line += 1;
                    }
                    if chars[i] == '*' && chars[i + 1] == '/' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
                continue;
            }
        }
        if PUNCTUATION.contains(&c) {
            tokens.push(Token {
                kind: TokenKind::Punct(c),
                line,
            });
            i += 1;
            continue;
        }
        if c == '"' {
            let start_line = line;
            let mut s = String::new();
            i += 1;
            loop {
                if i >= chars.len() {
                    return Err(FvError::parse(context, start_line, "字符串未闭合"));
                }
                match chars[i] {
                    '"' => {
                        i += 1;
                        break;
                    }
                    '\\' if i + 1 < chars.len() => {
                        s.push(chars[i + 1]);
                        i += 2;
                    }
                    ch => {
                        if ch == '\n' {
                            line += 1;
                        }
                        s.push(ch);
                        i += 1;
                    }
                }
            }
            tokens.push(Token {
                kind: TokenKind::Quoted(s),
                line,
            });
            continue;
        }

        let start = i;
        while i < chars.len()
            && !chars[i].is_whitespace()
            && !PUNCTUATION.contains(&chars[i])
            && chars[i] != '"'
        {
            i += 1;
        }
        let word: String = chars[start..i].iter().collect();
        let kind = if starts_like_number(&word) {
            match word.parse::<f64>() {
                Ok(v) => TokenKind::Number(v),
                Err(_) => TokenKind::Word(word),
            }
        } else {
            TokenKind::Word(word)
        };
        tokens.push(Token { kind, line });
    }

    Ok(tokens)
}

fn starts_like_number(word: &str) -> bool {
    word.chars()
        .next()
        .map(|c| c.is_ascii_digit() || c == '-' || c == '+' || c == '.')
        .unwrap_or(false)
}

// ============================================================================
// 游标
// ============================================================================

/// 词法单元游标，供各类型的读取实现使用
#[derive(Debug, Clone)]
pub struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    /// 创建游标
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// 查看下一个单元
    #[inline]
    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    /// 查看之后第 `n` 个单元
    #[inline]
    pub fn peek_nth(&self, n: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + n)
    }

    /// 取出下一个单元
    pub fn next_token(&mut self) -> Result<&'a Token, String> {
        let t = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| "意外的输入结束".to_string())?;
        self.pos += 1;
        Ok(t)
    }

    /// 是否已读完
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// 当前位置
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 剩余单元
    pub fn remaining(&self) -> &'a [Token] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    /// 读取指定分隔符
    pub fn expect_punct(&mut self, c: char) -> Result<(), String> {
        let t = self.next_token()?;
        if t.is_punct(c) {
            Ok(())
        } else {
            Err(format!("期望 '{c}', 实际 '{t}'"))
        }
    }

    /// 下一个单元是给定分隔符时消费它
    pub fn eat_punct(&mut self, c: char) -> bool {
        if self.peek().map(|t| t.is_punct(c)).unwrap_or(false) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// 读取数字；`nan`、`inf` 等单词也按数字处理
    pub fn next_number(&mut self) -> Result<f64, String> {
        let t = self.next_token()?;
        match &t.kind {
            TokenKind::Number(v) => Ok(*v),
            TokenKind::Word(w) => match w.to_ascii_lowercase().as_str() {
                "nan" => Ok(f64::NAN),
                "inf" | "infinity" => Ok(f64::INFINITY),
                _ => Err(format!("期望数字, 实际 '{w}'")),
            },
            _ => Err(format!("期望数字, 实际 '{t}'")),
        }
    }

    /// 读取非负整数
    pub fn next_label(&mut self) -> Result<usize, String> {
        let v = self.next_number()?;
        if v >= 0.0 && v.fract() == 0.0 {
            Ok(v as usize)
        } else {
            Err(format!("期望非负整数, 实际 {v}"))
        }
    }

    /// 读取单词或带引号字符串
    pub fn next_word(&mut self) -> Result<String, String> {
        let t = self.next_token()?;
        match &t.kind {
            TokenKind::Word(w) => Ok(w.clone()),
            TokenKind::Quoted(s) => Ok(s.clone()),
            _ => Err(format!("期望单词, 实际 '{t}'")),
        }
    }
}

/// 将词法单元序列还原为文本（用于错误信息）
pub fn tokens_to_string(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_entry_with_list() {
        let tokens = tokenize("test", "value nonuniform List<scalar> 3(1 2.5 -3e-2);").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Word("value".into()));
        assert_eq!(tokens[2].kind, TokenKind::Word("List<scalar>".into()));
        assert_eq!(tokens[3].kind, TokenKind::Number(3.0));
        assert!(tokens[4].is_punct('('));
        assert_eq!(tokens[7].kind, TokenKind::Number(-0.03));
        assert!(tokens.last().unwrap().is_punct(';'));
    }

    #[test]
    fn test_comments_and_lines() {
        let text = "// header\na 1; /* block\ncomment */ b 2;";
        let tokens = tokenize("test", text).unwrap();
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[3].line, 3);
    }

    #[test]
    fn test_unterminated_comment_is_error() {
        assert!(tokenize("test", "a /* never closed").is_err());
    }

    #[test]
    fn test_cursor_nan_word() {
        let tokens = tokenize("test", "nan 2").unwrap();
        let mut c = TokenCursor::new(&tokens);
        assert!(c.next_number().unwrap().is_nan());
        assert_eq!(c.next_label().unwrap(), 2);
        assert!(c.is_empty());
    }
}
