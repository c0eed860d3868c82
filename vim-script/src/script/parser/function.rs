//! # 函数声明解析
//!
//! ```text
//! function[!] {name}({args}) [range] [abort] [dict] [closure]
//!   {body}
//! endfunction
//! ```
//!
//! 函数头没有标志时，紧随其后的一行如果只由标志组成，也视为标志行：
//! - 第一个词是标志关键字，或
//! - 全部是裸词，且第一个词不是已知的 Ex 指令
//!
//! 标志行中的每个词都必须是合法标志，否则报 `UnknownFunctionFlag`。

use std::collections::BTreeSet;

use crate::error::ParseError;
use crate::script::ast::{FunctionDeclaration, FunctionFlag, ScriptUnit};
use crate::script::expr::{FunctionName, Scope};
use crate::script::keywords::is_known_command;
use crate::script::lexer::{Position, Token, TokenKind};

use super::cursor::{MAX_NESTING_DEPTH, TokenCursor, nesting_too_deep};
use super::expr_parser::function_scope;
use super::units::{UnitParser, is_end_function};

impl<'a> UnitParser<'a> {
    /// 解析函数声明，`cursor` 位于 function 关键字之后
    pub(super) fn parse_function(
        &mut self,
        mut cursor: TokenCursor<'a>,
        line: usize,
    ) -> Result<FunctionDeclaration, ParseError> {
        let replace_existing = cursor.eat(&TokenKind::Bang);
        let name = parse_function_name(&mut cursor)?;
        let args = parse_parameters(&mut cursor)?;
        let mut flags = parse_flags(&mut cursor)?;
        cursor.expect_end()?;

        if flags.is_empty()
            && let Some(line_flags) = self.take_flag_line()?
        {
            flags = line_flags;
        }

        if self.depth >= MAX_NESTING_DEPTH {
            return Err(nesting_too_deep(cursor.position()));
        }
        self.depth += 1;
        let body = self.parse_body(&name, line);
        self.depth -= 1;
        let body = body?;

        Ok(FunctionDeclaration {
            name: name.name,
            scope: name.scope,
            args,
            flags,
            body,
            replace_existing,
        })
    }

    /// 若下一行是标志行则消费它
    fn take_flag_line(&mut self) -> Result<Option<BTreeSet<FunctionFlag>>, ParseError> {
        let Some(Ok(tokens)) = self.lines.get(self.index).map(|line| &line.tokens) else {
            return Ok(None);
        };
        let Some(words) = flag_line_words(tokens) else {
            return Ok(None);
        };
        self.index += 1;

        let mut flags = BTreeSet::new();
        for (word, position) in words {
            let flag = FunctionFlag::from_name(word).ok_or_else(|| unknown_flag(word, position))?;
            flags.insert(flag);
        }
        Ok(Some(flags))
    }

    /// 解析函数体直到 endfunction（含嵌套声明）
    fn parse_body(
        &mut self,
        name: &FunctionName,
        header_line: usize,
    ) -> Result<Vec<ScriptUnit>, ParseError> {
        let mut body = Vec::new();
        loop {
            let lines = self.lines;
            let Some(line) = lines.get(self.index) else {
                return Err(ParseError::UnterminatedFunction {
                    line: header_line,
                    name: name.to_string(),
                });
            };

            if let Ok(tokens) = &line.tokens
                && is_end_function(tokens)
            {
                self.index += 1;
                let mut cursor = TokenCursor::new(tokens);
                cursor.advance();
                cursor.expect_end()?;
                return Ok(body);
            }

            match self.next_unit() {
                Some(unit) => body.push(unit?),
                None => {
                    return Err(ParseError::UnterminatedFunction {
                        line: header_line,
                        name: name.to_string(),
                    });
                }
            }
        }
    }
}

/// 解析函数名，支持 `s:`/`g:` 前缀和字典路径 `dict.key.Fn`
///
/// 字典路径保留完整原文（含前缀）作为名称。
pub(super) fn parse_function_name(
    cursor: &mut TokenCursor<'_>,
) -> Result<FunctionName, ParseError> {
    let position = cursor.position();
    let (prefix, first, _) = cursor.expect_identifier("函数名").map_err(|_| {
        invalid_name(
            position,
            format!("缺少函数名，实际为 {}", cursor.describe_current()),
        )
    })?;

    let scope = function_scope(prefix).ok_or_else(|| {
        invalid_name(
            position,
            format!(
                "函数名不能使用 '{}' 前缀",
                prefix.map(Scope::prefix).unwrap_or_default()
            ),
        )
    })?;

    let mut segments = vec![first];
    while cursor.eat(&TokenKind::Dot) {
        let segment_position = cursor.position();
        match cursor.expect_identifier("字典键名") {
            Ok((None, segment, _)) => segments.push(segment),
            _ => {
                return Err(invalid_name(
                    segment_position,
                    "字典路径中的键名无效".to_string(),
                ));
            }
        }
    }

    let name = if segments.len() > 1 {
        format!(
            "{}{}",
            scope.map(Scope::prefix).unwrap_or_default(),
            segments.join(".")
        )
    } else {
        first.to_string()
    };

    Ok(FunctionName::new(scope, name))
}

/// 解析形参列表 `(a, b, c)`
fn parse_parameters(cursor: &mut TokenCursor<'_>) -> Result<Vec<String>, ParseError> {
    cursor.expect(&TokenKind::LeftParen, "左括号 '('")?;
    let mut args = Vec::new();
    if cursor.eat(&TokenKind::RightParen) {
        return Ok(args);
    }

    loop {
        match cursor.peek() {
            Some(Token {
                kind: TokenKind::Identifier { scope: None, name },
                ..
            }) => {
                cursor.advance();
                args.push(name.clone());
            }
            _ => return Err(cursor.expected("参数名")),
        }

        if cursor.eat(&TokenKind::Comma) {
            continue;
        }
        cursor.expect(&TokenKind::RightParen, "',' 或 ')'")?;
        return Ok(args);
    }
}

/// 解析函数头同一行上的标志
fn parse_flags(cursor: &mut TokenCursor<'_>) -> Result<BTreeSet<FunctionFlag>, ParseError> {
    let mut flags = BTreeSet::new();
    while let Some(Token {
        kind: TokenKind::Identifier { scope: None, name },
        position,
        ..
    }) = cursor.peek()
    {
        let flag = FunctionFlag::from_name(name).ok_or_else(|| unknown_flag(name, *position))?;
        flags.insert(flag);
        cursor.advance();
    }
    Ok(flags)
}

/// 判断一行是否是标志行，是则返回其中的词及位置
///
/// 标志行被词法分析为普通指令：指令名 + 参数原文。
fn flag_line_words(tokens: &[Token]) -> Option<Vec<(&str, Position)>> {
    let (first, first_position) = match tokens.first() {
        Some(Token {
            kind: TokenKind::Identifier { scope: None, name },
            position,
            ..
        }) => (name.as_str(), *position),
        _ => return None,
    };

    let mut words = vec![(first, first_position)];
    match tokens.get(1).map(|t| (&t.kind, t.position)) {
        Some((TokenKind::EndOfLine, _)) => {}
        Some((TokenKind::Text(rest), base)) => {
            for (offset, word) in split_words(rest) {
                // 其后是注释
                if word.starts_with('"') {
                    break;
                }
                words.push((
                    word,
                    Position {
                        line: base.line,
                        column: base.column + offset,
                    },
                ));
            }
        }
        _ => return None,
    }

    let is_flag_line = FunctionFlag::from_name(first).is_some()
        || (!is_known_command(first) && words.iter().all(|(word, _)| is_bare_word(word)));
    is_flag_line.then_some(words)
}

/// 按空白切分，返回 (字节偏移, 词)
fn split_words(text: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut start = None;
    for (idx, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                words.push((s, &text[s..idx]));
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }
    if let Some(s) = start {
        words.push((s, &text[s..]));
    }
    words
}

fn is_bare_word(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn unknown_flag(word: &str, position: Position) -> ParseError {
    ParseError::UnknownFunctionFlag {
        line: position.line,
        column: position.column,
        flag: word.to_string(),
    }
}

fn invalid_name(position: Position, message: String) -> ParseError {
    ParseError::InvalidFunctionName {
        line: position.line,
        column: position.column,
        message,
    }
}
