//! # Parser 模块
//!
//! 两阶段脚本解析器实现（手写递归下降，无 regex 依赖）。
//!
//! ## 架构
//!
//! ```text
//! 原始文本 → [阶段1: 逐行词法分析] → Vec<LexedLine> → [阶段2: 单元解析] → Vec<ScriptUnit>
//! ```
//!
//! ## 模块结构
//!
//! - `cursor`: 单行记号游标
//! - `expr_parser`: 表达式解析器
//! - `units`: 单元（指令）解析
//! - `function`: 函数声明解析
//!
//! ## 两种模式
//!
//! - [`Parser::parse`]：遇到第一个错误即返回
//! - [`Parser::parse_lenient`]：记录错误并跳过出错的单元，尽量解析其余内容

mod cursor;
mod expr_parser;
mod function;
mod units;

#[cfg(test)]
mod tests;

use tracing::debug;

use crate::error::ParseError;
use crate::script::ast::Script;
use crate::script::lexer::lex_lines;

use units::UnitParser;

// 重新导出表达式解析函数
pub use expr_parser::parse_expression;

/// 脚本解析器
#[derive(Debug, Default)]
pub struct Parser {
    /// 宽松模式下收集的错误
    errors: Vec<ParseError>,
}

impl Parser {
    /// 创建新的解析器
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// 解析脚本文本
    ///
    /// # 参数
    ///
    /// - `script_id`: 脚本标识符
    /// - `text`: 脚本文本内容
    ///
    /// # 返回
    ///
    /// 解析后的 `Script`，或遇到的第一个解析错误
    pub fn parse(&mut self, script_id: &str, text: &str) -> Result<Script, ParseError> {
        self.errors.clear();

        // 阶段 1：逐行词法分析
        let lines = lex_lines(text);

        // 阶段 2：单元解析（同时收集行号）
        let mut parser = UnitParser::new(&lines);
        let mut units = Vec::new();
        let mut source_map = Vec::new();
        while let Some(line_number) = parser.peek_line_number() {
            let Some(unit) = parser.next_unit() else {
                break;
            };
            units.push(unit?);
            source_map.push(line_number);
        }

        debug!(script = script_id, units = units.len(), "脚本解析完成");
        Ok(Script::with_source_map(script_id, units, source_map))
    }

    /// 宽松解析
    ///
    /// 出错的单元被跳过（出错的函数声明整体跳过到匹配的 endfunction），
    /// 错误可通过 [`Parser::errors`] 获取。
    pub fn parse_lenient(&mut self, script_id: &str, text: &str) -> Script {
        self.errors.clear();

        let lines = lex_lines(text);
        let mut parser = UnitParser::new(&lines);
        let mut units = Vec::new();
        let mut source_map = Vec::new();
        while let Some(line_number) = parser.peek_line_number() {
            let start = parser.index;
            match parser.next_unit() {
                Some(Ok(unit)) => {
                    units.push(unit);
                    source_map.push(line_number);
                }
                Some(Err(e)) => {
                    debug!(script = script_id, error = %e, "跳过无法解析的单元");
                    self.errors.push(e);
                    parser.recover(start);
                }
                None => break,
            }
        }

        Script::with_source_map(script_id, units, source_map)
    }

    /// 获取最近一次宽松解析记录的错误
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }
}
