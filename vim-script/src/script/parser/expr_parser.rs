//! # 表达式解析器
//!
//! 递归下降表达式解析器。
//!
//! ```text
//! expr    := primary (('.' | '..') primary)*
//! primary := string | number | '(' expr ')' | name '(' args ')' | variable
//! ```

use crate::error::ParseError;
use crate::script::expr::{Expr, FunctionName, Scope};
use crate::script::lexer::{Token, TokenKind};

use super::cursor::TokenCursor;

/// 从记号序列开头解析一个表达式
///
/// 返回表达式和剩余的记号。
pub fn parse_expression(tokens: &[Token]) -> Result<(Expr, &[Token]), ParseError> {
    let mut cursor = TokenCursor::new(tokens);
    let expr = parse_expr(&mut cursor)?;
    Ok((expr, cursor.rest()))
}

/// 解析连接表达式（最低优先级，左结合）
///
/// 括号、调用实参和连接链都计入嵌套层数，求值时的递归深度因此同样有界。
pub(super) fn parse_expr(cursor: &mut TokenCursor<'_>) -> Result<Expr, ParseError> {
    cursor.descend()?;
    let mut levels = 1;
    let mut left = parse_primary(cursor)?;

    while matches!(cursor.peek_kind(), Some(TokenKind::Dot | TokenKind::DotDot)) {
        cursor.advance();
        cursor.descend()?;
        levels += 1;
        let right = parse_primary(cursor)?;
        left = Expr::concat(left, right);
    }

    cursor.ascend(levels);
    Ok(left)
}

/// 解析基本表达式
fn parse_primary(cursor: &mut TokenCursor<'_>) -> Result<Expr, ParseError> {
    let position = cursor.position();
    let Some(token) = cursor.peek() else {
        return Err(expression_error(cursor, "表达式意外结束"));
    };

    match &token.kind {
        TokenKind::String(s) => {
            cursor.advance();
            Ok(Expr::string(s.clone()))
        }
        TokenKind::Number(n) => {
            cursor.advance();
            Ok(Expr::number(*n))
        }
        TokenKind::LeftParen => {
            cursor.advance();
            let expr = parse_expr(cursor)?;
            cursor.expect(&TokenKind::RightParen, "右括号 ')'")?;
            Ok(expr)
        }
        TokenKind::Identifier { scope, name } => {
            cursor.advance();
            if cursor.peek_kind() == Some(&TokenKind::LeftParen) {
                let scope = function_scope(*scope).ok_or_else(|| ParseError::Expression {
                    line: position.line,
                    column: position.column,
                    message: format!("不能以 '{}' 作用域调用函数", scope_prefix(*scope)),
                })?;
                let args = parse_call_arguments(cursor)?;
                Ok(Expr::call(FunctionName::new(scope, name.clone()), args))
            } else {
                Ok(Expr::var(*scope, name.clone()))
            }
        }
        TokenKind::EndOfLine => Err(expression_error(cursor, "表达式意外结束")),
        other => Err(expression_error(
            cursor,
            &format!("意外的 {}", other.describe()),
        )),
    }
}

/// 解析 `(arg, arg, ...)`，当前记号必须是 `(`
pub(super) fn parse_call_arguments(cursor: &mut TokenCursor<'_>) -> Result<Vec<Expr>, ParseError> {
    cursor.expect(&TokenKind::LeftParen, "左括号 '('")?;
    let mut args = Vec::new();

    if cursor.eat(&TokenKind::RightParen) {
        return Ok(args);
    }

    loop {
        args.push(parse_expr(cursor)?);
        if cursor.eat(&TokenKind::Comma) {
            continue;
        }
        cursor.expect(&TokenKind::RightParen, "',' 或 ')'")?;
        return Ok(args);
    }
}

/// 函数调用允许的作用域：无前缀、`g:`、`s:`
///
/// 返回 `None` 表示作用域不合法。
pub(super) fn function_scope(scope: Option<Scope>) -> Option<Option<Scope>> {
    match scope {
        None => Some(None),
        Some(Scope::Global) => Some(Some(Scope::Global)),
        Some(Scope::Script) => Some(Some(Scope::Script)),
        Some(_) => None,
    }
}

fn scope_prefix(scope: Option<Scope>) -> &'static str {
    scope.map(Scope::prefix).unwrap_or("")
}

fn expression_error(cursor: &TokenCursor<'_>, message: &str) -> ParseError {
    let position = cursor.position();
    ParseError::Expression {
        line: position.line,
        column: position.column,
        message: message.to_string(),
    }
}
