//! # 单元解析
//!
//! 在逻辑行序列上逐个解析 [`ScriptUnit`]。
//! 大多数单元只占一行；函数声明会一直读到与之匹配的 endfunction。

use crate::error::ParseError;
use crate::script::ast::{
    CallCommand, DelFunctionCommand, EchoCommand, GenericCommand, LetCommand, LetOperator,
    ReturnStatement, ScriptUnit, UnletCommand,
};
use crate::script::expr::{FunctionCall, ScopedVariableRef};
use crate::script::keywords::Keyword;
use crate::script::lexer::{LexedLine, Token, TokenKind};

use super::cursor::TokenCursor;
use super::expr_parser::{parse_call_arguments, parse_expr};
use super::function::parse_function_name;

/// 单元解析器
pub(super) struct UnitParser<'a> {
    pub(super) lines: &'a [LexedLine],
    /// 下一个待解析的行
    pub(super) index: usize,
    /// 当前所在的函数声明嵌套层数
    pub(super) depth: usize,
}

impl<'a> UnitParser<'a> {
    pub fn new(lines: &'a [LexedLine]) -> Self {
        Self {
            lines,
            index: 0,
            depth: 0,
        }
    }

    /// 下一个单元的起始行号，没有更多内容时返回 `None`
    pub fn peek_line_number(&self) -> Option<usize> {
        self.lines.get(self.index).map(|line| line.number)
    }

    /// 解析下一个单元，没有更多内容时返回 `None`
    ///
    /// 无论成功与否至少消费一行。
    pub fn next_unit(&mut self) -> Option<Result<ScriptUnit, ParseError>> {
        let lines = self.lines;
        let line = lines.get(self.index)?;
        self.index += 1;
        Some(self.parse_line(line))
    }

    fn parse_line(&mut self, line: &'a LexedLine) -> Result<ScriptUnit, ParseError> {
        let tokens = line
            .tokens
            .as_ref()
            .map_err(|e| ParseError::Lex(e.clone()))?;
        let mut cursor = TokenCursor::new(tokens);

        let range = match cursor.peek_kind() {
            Some(TokenKind::Range(range)) => {
                cursor.advance();
                Some(range.clone())
            }
            _ => None,
        };

        let Some(TokenKind::Keyword(keyword)) = cursor.peek_kind() else {
            return parse_generic(&mut cursor, range).map(ScriptUnit::Generic);
        };
        let keyword = *keyword;
        cursor.advance();

        if range.is_some() && keyword != Keyword::Call {
            return Err(ParseError::RangeNotAllowed {
                line: line.number,
                command: keyword.canonical().to_string(),
            });
        }

        match keyword {
            Keyword::Function => self
                .parse_function(cursor, line.number)
                .map(ScriptUnit::FunctionDeclaration),
            Keyword::EndFunction => Err(ParseError::UnexpectedEndFunction { line: line.number }),
            Keyword::Echo => parse_echo(&mut cursor, line.number).map(ScriptUnit::Echo),
            Keyword::Return => parse_return(&mut cursor, line.number).map(ScriptUnit::Return),
            Keyword::Let => parse_let(&mut cursor, line.number).map(ScriptUnit::Let),
            Keyword::Unlet => parse_unlet(&mut cursor, line.number).map(ScriptUnit::Unlet),
            Keyword::Call => parse_call(&mut cursor, range).map(ScriptUnit::Call),
            Keyword::DelFunction => parse_delfunction(&mut cursor).map(ScriptUnit::DelFunction),
        }
    }

    /// 跳过解析失败的单元
    ///
    /// 失败单元是函数声明时，按嵌套深度跳到与之匹配的 endfunction 之后，
    /// 否则只跳过起始行。
    pub fn recover(&mut self, start: usize) {
        if first_keyword(self.lines.get(start)) != Some(Keyword::Function) {
            self.index = self.index.max(start + 1);
            return;
        }

        let mut depth = 0usize;
        for (idx, line) in self.lines.iter().enumerate().skip(start) {
            match first_keyword(Some(line)) {
                Some(Keyword::Function) => depth += 1,
                Some(Keyword::EndFunction) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.index = idx + 1;
                        return;
                    }
                }
                _ => {}
            }
        }
        self.index = self.lines.len();
    }
}

/// 行首关键字（跳过行范围）
pub(super) fn first_keyword(line: Option<&LexedLine>) -> Option<Keyword> {
    let tokens = line?.tokens.as_ref().ok()?;
    let token = tokens
        .iter()
        .find(|t| !matches!(t.kind, TokenKind::Range(_)))?;
    match &token.kind {
        TokenKind::Keyword(keyword) => Some(*keyword),
        _ => None,
    }
}

/// 是否是 endfunction 行
pub(super) fn is_end_function(tokens: &[Token]) -> bool {
    matches!(
        tokens.first().map(|t| &t.kind),
        Some(TokenKind::Keyword(Keyword::EndFunction))
    )
}

fn parse_echo(cursor: &mut TokenCursor<'_>, line: usize) -> Result<EchoCommand, ParseError> {
    if cursor.at_end() {
        return Err(ParseError::MissingArgument {
            line,
            command: Keyword::Echo.canonical().to_string(),
        });
    }

    let mut expressions = Vec::new();
    while !cursor.at_end() {
        expressions.push(parse_expr(cursor)?);
    }
    Ok(EchoCommand { expressions })
}

fn parse_return(cursor: &mut TokenCursor<'_>, line: usize) -> Result<ReturnStatement, ParseError> {
    if cursor.at_end() {
        return Err(ParseError::ReturnWithoutExpression { line });
    }
    let expression = parse_expr(cursor)?;
    cursor.expect_end()?;
    Ok(ReturnStatement { expression })
}

fn parse_let(cursor: &mut TokenCursor<'_>, line: usize) -> Result<LetCommand, ParseError> {
    if cursor.at_end() {
        return Err(ParseError::MissingArgument {
            line,
            command: Keyword::Let.canonical().to_string(),
        });
    }

    let (scope, name, _) = cursor.expect_identifier("变量名")?;
    let target = ScopedVariableRef::new(scope, name);

    let operator = if cursor.eat(&TokenKind::Equals) {
        LetOperator::Assign
    } else if cursor.eat(&TokenKind::DotEquals) {
        LetOperator::Append
    } else {
        return Err(cursor.expected("'=' 或 '.='"));
    };

    let value = parse_expr(cursor)?;
    cursor.expect_end()?;
    Ok(LetCommand {
        target,
        operator,
        value,
    })
}

fn parse_unlet(cursor: &mut TokenCursor<'_>, line: usize) -> Result<UnletCommand, ParseError> {
    let bang = cursor.eat(&TokenKind::Bang);

    let mut targets = Vec::new();
    while !cursor.at_end() {
        let (scope, name, _) = cursor.expect_identifier("变量名")?;
        targets.push(ScopedVariableRef::new(scope, name));
    }

    if targets.is_empty() {
        return Err(ParseError::MissingArgument {
            line,
            command: Keyword::Unlet.canonical().to_string(),
        });
    }
    Ok(UnletCommand { bang, targets })
}

fn parse_call(
    cursor: &mut TokenCursor<'_>,
    range: Option<String>,
) -> Result<CallCommand, ParseError> {
    let name = parse_function_name(cursor)?;
    let args = parse_call_arguments(cursor)?;
    cursor.expect_end()?;
    Ok(CallCommand {
        range,
        call: FunctionCall { name, args },
    })
}

fn parse_delfunction(cursor: &mut TokenCursor<'_>) -> Result<DelFunctionCommand, ParseError> {
    let bang = cursor.eat(&TokenKind::Bang);
    let name = parse_function_name(cursor)?;
    cursor.expect_end()?;
    Ok(DelFunctionCommand { bang, name })
}

/// 普通指令：指令名、可选的 `!`、参数原文
fn parse_generic(
    cursor: &mut TokenCursor<'_>,
    range: Option<String>,
) -> Result<GenericCommand, ParseError> {
    // 只有行范围的行（如 `:5`）是跳转指令，名称为空
    let name = match cursor.peek_kind() {
        Some(TokenKind::Identifier { name, .. }) => {
            cursor.advance();
            name.clone()
        }
        _ => String::new(),
    };

    let bang = cursor.eat(&TokenKind::Bang);

    let args = match cursor.peek_kind() {
        Some(TokenKind::Text(text)) => {
            cursor.advance();
            text.clone()
        }
        _ => String::new(),
    };

    cursor.expect_end()?;
    Ok(GenericCommand {
        range,
        name,
        bang,
        args,
    })
}
