//! # Script 模块
//!
//! 脚本解析相关功能，包括词法分析、AST 定义和解析器实现。
//!
//! ## 模块结构
//!
//! - [`lexer`]：逻辑行拼接与记号切分
//! - [`keywords`]：关键字缩写表
//! - [`expr`]：表达式与作用域定义
//! - [`ast`]：脚本抽象语法树定义
//! - [`parser`]：两阶段解析器实现

pub mod ast;
pub mod expr;
pub mod keywords;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use expr::{Expr, FunctionCall, FunctionName, Scope, ScopedVariableRef};
pub use keywords::Keyword;
pub use lexer::{Position, Token, TokenKind, tokenize};
pub use parser::{Parser, parse_expression};
