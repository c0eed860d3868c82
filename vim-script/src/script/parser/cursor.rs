//! # 记号游标
//!
//! 在单个逻辑行的记号序列上前进，提供期望/报错的辅助方法。

use crate::error::ParseError;
use crate::script::expr::Scope;
use crate::script::lexer::{Position, Token, TokenKind};

/// 表达式与函数声明允许的最大嵌套层数
pub(super) const MAX_NESTING_DEPTH: usize = 200;

/// 记号游标
pub struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// 当前表达式嵌套层数
    depth: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// 尚未消费的记号
    pub fn rest(&self) -> &'a [Token] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    pub fn peek_kind(&self) -> Option<&'a TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    pub fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    /// 当前记号与 `kind` 相同时消费它
    pub fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// 是否到达行尾
    pub fn at_end(&self) -> bool {
        matches!(self.peek_kind(), None | Some(TokenKind::EndOfLine))
    }

    /// 当前位置（到达末尾时取最后一个记号的位置）
    pub fn position(&self) -> Position {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|t| t.position)
            .unwrap_or(Position { line: 0, column: 0 })
    }

    /// 当前记号的描述
    pub fn describe_current(&self) -> String {
        self.peek_kind()
            .map(TokenKind::describe)
            .unwrap_or_else(|| "行尾".to_string())
    }

    /// 消费指定记号，否则报 `ExpectedToken`
    pub fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<&'a Token, ParseError> {
        match self.peek() {
            Some(token) if &token.kind == kind => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.expected(expected)),
        }
    }

    /// 消费一个标识符，返回 (作用域, 名称)
    pub fn expect_identifier(
        &mut self,
        expected: &str,
    ) -> Result<(Option<Scope>, &'a str, Position), ParseError> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Identifier { scope, name },
                position,
                ..
            }) => {
                self.pos += 1;
                Ok((*scope, name.as_str(), *position))
            }
            _ => Err(self.expected(expected)),
        }
    }

    /// 进入一层嵌套，超过 [`MAX_NESTING_DEPTH`] 时报错
    pub fn descend(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(nesting_too_deep(self.position()));
        }
        self.depth += 1;
        Ok(())
    }

    /// 退出 `levels` 层嵌套
    pub fn ascend(&mut self, levels: usize) {
        self.depth = self.depth.saturating_sub(levels);
    }

    /// 构造"期望 X"错误
    pub fn expected(&self, expected: &str) -> ParseError {
        let position = self.position();
        ParseError::ExpectedToken {
            line: position.line,
            column: position.column,
            expected: expected.to_string(),
            found: self.describe_current(),
        }
    }

    /// 要求已到达行尾
    pub fn expect_end(&self) -> Result<(), ParseError> {
        if self.at_end() {
            return Ok(());
        }
        let position = self.position();
        let text = self
            .rest()
            .iter()
            .map(|t| t.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Err(ParseError::TrailingCharacters {
            line: position.line,
            column: position.column,
            text,
        })
    }
}

pub(super) fn nesting_too_deep(position: Position) -> ParseError {
    ParseError::NestingTooDeep {
        line: position.line,
        column: position.column,
        limit: MAX_NESTING_DEPTH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::lexer::tokenize;

    #[test]
    fn test_expect_and_eat() {
        let tokens = tokenize("call F(1)").unwrap();
        let mut cursor = TokenCursor::new(&tokens);
        cursor.advance();
        let (scope, name, _) = cursor.expect_identifier("函数名").unwrap();
        assert_eq!((scope, name), (None, "F"));
        assert!(cursor.eat(&TokenKind::LeftParen));
        assert!(!cursor.eat(&TokenKind::Comma));
        assert!(cursor.expect(&TokenKind::RightParen, "')'").is_err());
        cursor.advance();
        assert!(cursor.expect(&TokenKind::RightParen, "')'").is_ok());
        assert!(cursor.at_end());
        assert!(cursor.expect_end().is_ok());
    }

    #[test]
    fn test_trailing_characters() {
        let tokens = tokenize("return 'a' 'b'").unwrap();
        let mut cursor = TokenCursor::new(&tokens);
        cursor.advance();
        cursor.advance();
        let err = cursor.expect_end().unwrap_err();
        assert!(matches!(
            err,
            ParseError::TrailingCharacters { line: 1, column: 12, ref text } if text == "'b'"
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let tokens = tokenize("echo 1").unwrap();
        let mut cursor = TokenCursor::new(&tokens);
        for _ in 0..MAX_NESTING_DEPTH {
            cursor.descend().unwrap();
        }
        assert!(matches!(
            cursor.descend(),
            Err(ParseError::NestingTooDeep { line: 1, limit, .. }) if limit == MAX_NESTING_DEPTH
        ));
        cursor.ascend(1);
        assert!(cursor.descend().is_ok());
    }
}
