//! # 词法分析
//!
//! 将脚本文本切分为记号（Token）。
//!
//! ## 处理流程
//!
//! ```text
//! 原始文本 → [逻辑行拼接] → Vec<LogicalLine> → [逐行切分] → Vec<LexedLine>
//! ```
//!
//! - 以 `\` 开头的物理行接在上一逻辑行之后（续行）
//! - 以 `"` 开头的行是注释，空行和注释行不产生任何记号
//! - 行首是关键字（function / echo / return ...）时，余下部分按表达式语法切分；
//!   否则指令名之后的内容整体作为一个 [`TokenKind::Text`]，交由宿主解释
//! - 记号之间的空白只起分隔作用，数量不影响结果

use serde::{Deserialize, Serialize};

use crate::error::LexError;

use super::expr::Scope;
use super::keywords::Keyword;

/// 源码位置（行号、列号均从 1 开始，列号按字节计）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// 记号类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    /// 行首关键字
    Keyword(Keyword),
    /// 标识符，可带作用域前缀（`s:name`）
    Identifier { scope: Option<Scope>, name: String },
    /// 字符串字面量（已处理转义）
    String(String),
    /// 数字字面量
    Number(i64),
    /// 行范围（`%`、`1,3`、`'<,'>`）
    Range(String),
    /// 普通指令的参数原文
    Text(String),
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `..`
    DotDot,
    /// `.=`
    DotEquals,
    /// `!`
    Bang,
    /// `=`
    Equals,
    /// 逻辑行结束
    EndOfLine,
}

impl TokenKind {
    /// 用于错误信息的简短描述
    pub fn describe(&self) -> String {
        match self {
            Self::Keyword(k) => format!("关键字 '{}'", k.canonical()),
            Self::Identifier { scope, name } => match scope {
                Some(scope) => format!("标识符 '{}{}'", scope.prefix(), name),
                None => format!("标识符 '{name}'"),
            },
            Self::String(s) => format!("字符串 {s:?}"),
            Self::Number(n) => format!("数字 {n}"),
            Self::Range(r) => format!("范围 '{r}'"),
            Self::Text(t) => format!("'{t}'"),
            Self::LeftParen => "'('".to_string(),
            Self::RightParen => "')'".to_string(),
            Self::Comma => "','".to_string(),
            Self::Dot => "'.'".to_string(),
            Self::DotDot => "'..'".to_string(),
            Self::DotEquals => "'.='".to_string(),
            Self::Bang => "'!'".to_string(),
            Self::Equals => "'='".to_string(),
            Self::EndOfLine => "行尾".to_string(),
        }
    }
}

/// 记号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// 源码原文
    pub text: String,
    pub position: Position,
}

/// 逻辑行中的一段（来自同一物理行）
#[derive(Debug, Clone)]
struct Segment {
    /// 在逻辑行文本中的起始偏移
    offset: usize,
    line: usize,
    /// 该段第一个字节在物理行中的列号
    column: usize,
}

/// 逻辑行（续行已拼接）
#[derive(Debug, Clone)]
pub struct LogicalLine {
    /// 起始物理行号
    pub number: usize,
    pub text: String,
    segments: Vec<Segment>,
}

impl LogicalLine {
    fn new(number: usize, text: &str) -> Self {
        Self {
            number,
            text: text.to_string(),
            segments: vec![Segment {
                offset: 0,
                line: number,
                column: 1,
            }],
        }
    }

    fn append_continuation(&mut self, line: usize, column: usize, text: &str) {
        self.segments.push(Segment {
            offset: self.text.len(),
            line,
            column,
        });
        self.text.push_str(text);
    }

    /// 逻辑行内偏移对应的源码位置
    pub fn position(&self, offset: usize) -> Position {
        let segment = self
            .segments
            .iter()
            .rev()
            .find(|s| s.offset <= offset)
            .unwrap_or(&self.segments[0]);
        Position {
            line: segment.line,
            column: segment.column + offset - segment.offset,
        }
    }
}

/// 按逻辑行切分后的结果
#[derive(Debug, Clone)]
pub struct LexedLine {
    /// 起始物理行号
    pub number: usize,
    /// 该行的记号（以 [`TokenKind::EndOfLine`] 结尾），或词法错误
    pub tokens: Result<Vec<Token>, LexError>,
}

/// 拼接续行，得到逻辑行
pub fn logical_lines(source: &str) -> Vec<LogicalLine> {
    let mut lines: Vec<LogicalLine> = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let number = idx + 1;
        let trimmed = raw.trim_start();
        let indent = raw.len() - trimmed.len();

        // 续行注释 `"\ `
        if trimmed.starts_with("\"\\ ") {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('\\')
            && let Some(previous) = lines.last_mut()
        {
            previous.append_continuation(number, indent + 2, rest);
            continue;
        }

        lines.push(LogicalLine::new(number, raw));
    }

    lines
}

/// 切分整个脚本
///
/// 遇到第一个词法错误即返回。
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    for line in lex_lines(source) {
        tokens.extend(line.tokens?);
    }
    Ok(tokens)
}

/// 逐逻辑行切分
///
/// 空行和注释行不出现在结果中；某一行的词法错误不影响其他行。
pub fn lex_lines(source: &str) -> Vec<LexedLine> {
    logical_lines(source)
        .iter()
        .filter_map(|line| match tokenize_line(line) {
            Ok(tokens) if tokens.is_empty() => None,
            result => Some(LexedLine {
                number: line.number,
                tokens: result,
            }),
        })
        .collect()
}

/// 切分单个逻辑行
///
/// 空行和注释行返回空列表。
pub fn tokenize_line(line: &LogicalLine) -> Result<Vec<Token>, LexError> {
    LineLexer::new(line).run()
}

/// 单行词法分析器
struct LineLexer<'a> {
    line: &'a LogicalLine,
    text: &'a str,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> LineLexer<'a> {
    fn new(line: &'a LogicalLine) -> Self {
        Self {
            line,
            text: &line.text,
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        // 行首的空白和冒号都可以省略
        loop {
            self.skip_whitespace();
            if self.peek_char() == Some(':') {
                self.pos += 1;
            } else {
                break;
            }
        }

        match self.peek_char() {
            None | Some('"') => return Ok(Vec::new()),
            _ => {}
        }

        self.lex_range();
        self.skip_whitespace();

        let word_start = self.pos;
        let word = self.take_while(|c| c.is_ascii_alphabetic());

        if let Some(keyword) = Keyword::lookup(word) {
            self.push(TokenKind::Keyword(keyword), word_start);
            self.lex_expression_tokens()?;
        } else if !word.is_empty() {
            self.push(
                TokenKind::Identifier {
                    scope: None,
                    name: word.to_string(),
                },
                word_start,
            );
            self.lex_command_arguments();
        } else {
            self.lex_symbol_command()?;
        }

        let end = self.text.len();
        self.tokens.push(Token {
            kind: TokenKind::EndOfLine,
            text: String::new(),
            position: self.line.position(end),
        });
        Ok(self.tokens)
    }

    fn remaining(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.remaining().chars().nth(1)
    }

    fn skip_whitespace(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.text[start..self.pos]
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            text: self.text[start..self.pos].to_string(),
            position: self.line.position(start),
        });
    }

    fn error_at(&self, offset: usize, found: char) -> LexError {
        let position = self.line.position(offset);
        LexError::UnexpectedCharacter {
            line: position.line,
            column: position.column,
            found,
        }
    }

    /// 行范围：数字、`.`、`$`、`%`、`,`、`;`、`+`、`-` 以及 `'x` 标记
    fn lex_range(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            match c {
                '0'..='9' | '.' | '$' | '%' | ',' | ';' | '+' | '-' => self.pos += 1,
                '\'' => match self.peek_second() {
                    Some(mark) => self.pos += 1 + mark.len_utf8(),
                    None => break,
                },
                _ => break,
            }
        }
        if self.pos > start {
            let range = self.text[start..self.pos].to_string();
            self.push(TokenKind::Range(range), start);
        }
    }

    /// 普通指令：可选的 `!` 和参数原文
    fn lex_command_arguments(&mut self) {
        if self.peek_char() == Some('!') {
            let start = self.pos;
            self.pos += 1;
            self.push(TokenKind::Bang, start);
        }
        self.skip_whitespace();
        let rest = self.remaining().trim_end();
        if !rest.is_empty() {
            let start = self.pos;
            self.pos += rest.len();
            self.push(TokenKind::Text(rest.to_string()), start);
        }
        self.pos = self.text.len();
    }

    /// 单字符指令名，如 `!ls`、`&&`、`>`
    fn lex_symbol_command(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return Ok(());
        };
        if !matches!(c, '!' | '&' | '<' | '>' | '=' | '@' | '*' | '~' | '#') {
            return Err(self.error_at(start, c));
        }
        self.pos += c.len_utf8();
        self.push(
            TokenKind::Identifier {
                scope: None,
                name: c.to_string(),
            },
            start,
        );
        self.skip_whitespace();
        let rest = self.remaining().trim_end();
        if !rest.is_empty() {
            let start = self.pos;
            self.pos += rest.len();
            self.push(TokenKind::Text(rest.to_string()), start);
        }
        self.pos = self.text.len();
        Ok(())
    }

    /// 按表达式语法切分关键字之后的内容
    fn lex_expression_tokens(&mut self) -> Result<(), LexError> {
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let Some(c) = self.peek_char() else {
                return Ok(());
            };

            match c {
                '\'' => self.lex_single_quoted()?,
                '"' if self.starts_comment() => {
                    self.pos = self.text.len();
                    return Ok(());
                }
                '"' => self.lex_double_quoted()?,
                '0'..='9' => self.lex_number(),
                c if c.is_ascii_alphabetic() || c == '_' => self.lex_identifier(),
                '(' => self.single(TokenKind::LeftParen),
                ')' => self.single(TokenKind::RightParen),
                ',' => self.single(TokenKind::Comma),
                '!' => self.single(TokenKind::Bang),
                '=' => self.single(TokenKind::Equals),
                '.' => match self.peek_second() {
                    Some('.') => {
                        self.pos += 2;
                        if self.peek_char() == Some('.') {
                            return Err(self.error_at(self.pos, '.'));
                        }
                        self.push(TokenKind::DotDot, start);
                    }
                    Some('=') => {
                        self.pos += 2;
                        self.push(TokenKind::DotEquals, start);
                    }
                    _ => self.single(TokenKind::Dot),
                },
                other => return Err(self.error_at(start, other)),
            }
        }
    }

    /// `"` 出现在 endfunction 之后或函数头的参数列表之后时开始注释
    fn starts_comment(&self) -> bool {
        let keyword = self.tokens.iter().find_map(|t| match t.kind {
            TokenKind::Keyword(keyword) => Some(keyword),
            _ => None,
        });
        let header_closed = self.tokens.iter().any(|t| t.kind == TokenKind::RightParen);
        match keyword {
            Some(Keyword::EndFunction) => true,
            Some(Keyword::Function) => header_closed,
            _ => false,
        }
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.pos;
        self.pos += 1;
        self.push(kind, start);
    }

    fn lex_number(&mut self) {
        let start = self.pos;
        let digits = self.take_while(|c| c.is_ascii_digit());
        // 超出 i64 范围时按 Vim 的行为截断到最大值
        let value = digits.parse::<i64>().unwrap_or(i64::MAX);
        self.push(TokenKind::Number(value), start);
    }

    fn lex_identifier(&mut self) {
        let start = self.pos;
        let head = self.take_while(is_identifier_char);

        let mut scope = None;
        let mut chars = head.chars();
        if let (Some(prefix), None) = (chars.next(), chars.next())
            && self.peek_char() == Some(':')
            && let Some(s) = Scope::from_prefix(prefix)
        {
            // `s:name`，`a:0` 这样的参数名可以以数字开头
            let after_colon = self.text[self.pos + 1..].chars().next();
            if after_colon.is_some_and(|c| is_identifier_char(c) || c.is_ascii_digit()) {
                self.pos += 1;
                scope = Some(s);
            }
        }

        let name = if scope.is_some() {
            self.take_while(|c| is_identifier_char(c) || c.is_ascii_digit())
        } else {
            head
        };

        self.push(
            TokenKind::Identifier {
                scope,
                name: name.to_string(),
            },
            start,
        );
    }

    /// 单引号字符串：没有转义，`''` 表示一个单引号
    fn lex_single_quoted(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();

        loop {
            match self.peek_char() {
                None => return Err(self.unterminated(start, '\'')),
                Some('\'') => {
                    self.pos += 1;
                    if self.peek_char() == Some('\'') {
                        value.push('\'');
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }

        self.push(TokenKind::String(value), start);
        Ok(())
    }

    /// 双引号字符串：支持反斜杠转义
    fn lex_double_quoted(&mut self) -> Result<(), LexError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();

        loop {
            match self.peek_char() {
                None => return Err(self.unterminated(start, '"')),
                Some('"') => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => {
                    self.pos += 1;
                    let Some(escaped) = self.peek_char() else {
                        return Err(self.unterminated(start, '"'));
                    };
                    self.pos += escaped.len_utf8();
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        'e' => '\u{1b}',
                        other => other,
                    });
                }
                Some(c) => {
                    value.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }

        self.push(TokenKind::String(value), start);
        Ok(())
    }

    fn unterminated(&self, start: usize, quote: char) -> LexError {
        let position = self.line.position(start);
        LexError::UnterminatedString {
            line: position.line,
            column: position.column,
            quote,
        }
    }
}

/// 标识符字符（`#` 用于 autoload 函数名）
fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '#'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn ident(scope: Option<Scope>, name: &str) -> TokenKind {
        TokenKind::Identifier {
            scope,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_function_header_tokens() {
        assert_eq!(
            kinds("function! s:Initialize(cmd, args) range"),
            vec![
                TokenKind::Keyword(Keyword::Function),
                TokenKind::Bang,
                ident(Some(Scope::Script), "Initialize"),
                TokenKind::LeftParen,
                ident(None, "cmd"),
                TokenKind::Comma,
                ident(None, "args"),
                TokenKind::RightParen,
                ident(None, "range"),
                TokenKind::EndOfLine,
            ]
        );
    }

    #[test]
    fn test_whitespace_does_not_change_tokens() {
        let compact = kinds("fu!s:F(a,b)abort");
        let spaced = kinds("   fu  !  s:F (  a ,   b  )   abort   ");
        assert_eq!(compact, spaced);
    }

    #[test]
    fn test_comment_and_blank_lines_produce_nothing() {
        let tokens = tokenize("\" a comment\n\n   \n  \" indented comment").unwrap();
        assert!(tokens.is_empty());
        assert!(lex_lines("\"x\n\n").is_empty());
    }

    #[test]
    fn test_trailing_comment_after_function_lines() {
        assert_eq!(
            kinds("endfunction \" done"),
            vec![
                TokenKind::Keyword(Keyword::EndFunction),
                TokenKind::EndOfLine,
            ]
        );
        assert_eq!(
            kinds("function! F() abort \" hdr"),
            kinds("function! F() abort")
        );
        assert_eq!(kinds("function F() \"x"), kinds("function F()"));

        // 其他位置的 `"` 仍然是字符串
        assert_eq!(
            kinds("return \"x\""),
            vec![
                TokenKind::Keyword(Keyword::Return),
                TokenKind::String("x".to_string()),
                TokenKind::EndOfLine,
            ]
        );
        assert!(tokenize("echo \"oops").is_err());
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            kinds(r#"echo 'it''s' "a\tb\"c""#),
            vec![
                TokenKind::Keyword(Keyword::Echo),
                TokenKind::String("it's".to_string()),
                TokenKind::String("a\tb\"c".to_string()),
                TokenKind::EndOfLine,
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("echo 'oops").unwrap_err();
        assert_eq!(
            err,
            LexError::UnterminatedString {
                line: 1,
                column: 6,
                quote: '\''
            }
        );

        let err = tokenize("\n\necho \"oops").unwrap_err();
        assert_eq!(err.line(), 3);
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("echo a:x @ b").unwrap_err();
        assert_eq!(
            err,
            LexError::UnexpectedCharacter {
                line: 1,
                column: 10,
                found: '@'
            }
        );
    }

    #[test]
    fn test_concat_operators() {
        assert_eq!(
            kinds("let x .= a:y . 'z' .. 1"),
            vec![
                TokenKind::Keyword(Keyword::Let),
                ident(None, "x"),
                TokenKind::DotEquals,
                ident(Some(Scope::Argument), "y"),
                TokenKind::Dot,
                TokenKind::String("z".to_string()),
                TokenKind::DotDot,
                TokenKind::Number(1),
                TokenKind::EndOfLine,
            ]
        );
    }

    #[test]
    fn test_scope_prefixes_and_special_names() {
        assert_eq!(
            kinds("echo a:0 g:x v:version foo#bar#Baz"),
            vec![
                TokenKind::Keyword(Keyword::Echo),
                ident(Some(Scope::Argument), "0"),
                ident(Some(Scope::Global), "x"),
                ident(Some(Scope::Vim), "version"),
                ident(None, "foo#bar#Baz"),
                TokenKind::EndOfLine,
            ]
        );
    }

    #[test]
    fn test_dotted_function_name() {
        assert_eq!(
            kinds("function! s:dict.something.Initialize()"),
            vec![
                TokenKind::Keyword(Keyword::Function),
                TokenKind::Bang,
                ident(Some(Scope::Script), "dict"),
                TokenKind::Dot,
                ident(None, "something"),
                TokenKind::Dot,
                ident(None, "Initialize"),
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::EndOfLine,
            ]
        );
    }

    #[test]
    fn test_generic_command_keeps_raw_arguments() {
        assert_eq!(
            kinds("nnoremap <leader>x :call Foo()<CR>"),
            vec![
                ident(None, "nnoremap"),
                TokenKind::Text("<leader>x :call Foo()<CR>".to_string()),
                TokenKind::EndOfLine,
            ]
        );
    }

    #[test]
    fn test_generic_command_with_range_and_bang() {
        assert_eq!(
            kinds(":'<,'>normal! gv"),
            vec![
                TokenKind::Range("'<,'>".to_string()),
                ident(None, "normal"),
                TokenKind::Bang,
                TokenKind::Text("gv".to_string()),
                TokenKind::EndOfLine,
            ]
        );
        assert_eq!(
            kinds("!ls -la"),
            vec![
                ident(None, "!"),
                TokenKind::Text("ls -la".to_string()),
                TokenKind::EndOfLine,
            ]
        );
    }

    #[test]
    fn test_line_continuation() {
        let source = "echo 'a'\n      \\ . 'b'\n\"\\ comment\n  \\ . 'c'";
        let lines = lex_lines(source);
        assert_eq!(lines.len(), 1);
        let tokens = lines[0].tokens.as_ref().unwrap();
        assert_eq!(tokens.len(), 7);
        // 续行中的记号保留其物理行位置
        let position = tokens[3].position;
        assert_eq!((position.line, position.column), (2, 11));
        assert_eq!(tokens[5].position.line, 4);
    }

    #[test]
    fn test_lex_error_is_per_line() {
        let lines = lex_lines("echo 'ok'\necho 'broken\necho 'fine'");
        assert_eq!(lines.len(), 3);
        assert!(lines[0].tokens.is_ok());
        assert!(lines[1].tokens.is_err());
        assert!(lines[2].tokens.is_ok());
    }
}
