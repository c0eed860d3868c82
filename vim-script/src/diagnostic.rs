//! # 诊断模块
//!
//! 提供脚本静态检查和诊断 API，不依赖 IO 或解释器。
//!
//! ## 设计原则
//!
//! - 纯函数 API，可在无 IO 环境下运行
//! - 诊断分级：Error（必须修复）、Warn（建议修复）、Info（信息提示）
//! - 复用 parser/AST，不重复解析逻辑

use std::collections::HashSet;

use crate::error::ParseError;
use crate::script::ast::{FunctionDeclaration, FunctionFlag, Script, ScriptUnit};
use crate::script::expr::{Expr, Scope};

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    /// 信息提示
    Info,
    /// 警告（建议修复）
    Warn,
    /// 错误（必须修复）
    Error,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 诊断条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 诊断级别
    pub level: DiagnosticLevel,
    /// 脚本 ID / 文件路径
    pub script_id: String,
    /// 行号（如果可定位，从 1 开始）
    pub line: Option<usize>,
    /// 诊断消息
    pub message: String,
    /// 诊断详情（可选）
    pub detail: Option<String>,
}

impl Diagnostic {
    fn new(
        level: DiagnosticLevel,
        script_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            script_id: script_id.into(),
            line: None,
            message: message.into(),
            detail: None,
        }
    }

    /// 创建错误诊断
    pub fn error(script_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, script_id, message)
    }

    /// 创建警告诊断
    pub fn warn(script_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warn, script_id, message)
    }

    /// 创建信息诊断
    pub fn info(script_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, script_id, message)
    }

    /// 由解析错误生成错误诊断
    pub fn from_parse_error(script_id: impl Into<String>, error: &ParseError) -> Self {
        Self::error(script_id, error.to_string()).with_line(error.line())
    }

    /// 设置行号
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// 设置可选行号
    fn with_optional_line(mut self, line: Option<usize>) -> Self {
        self.line = line;
        self
    }

    /// 设置详情
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level, self.script_id)?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n  | {}", detail)?;
        }
        Ok(())
    }
}

/// 诊断结果
#[derive(Debug, Clone, Default)]
pub struct DiagnosticResult {
    /// 诊断条目列表
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticResult {
    /// 创建空结果
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加诊断
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// 合并另一个结果
    pub fn merge(&mut self, other: DiagnosticResult) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// 获取错误数量
    pub fn error_count(&self) -> usize {
        self.count(DiagnosticLevel::Error)
    }

    /// 获取警告数量
    pub fn warn_count(&self) -> usize {
        self.count(DiagnosticLevel::Warn)
    }

    fn count(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics.iter().filter(|d| d.level == level).count()
    }

    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// 按级别过滤
    pub fn filter_by_level(&self, min_level: DiagnosticLevel) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level >= min_level)
            .collect()
    }
}

//=============================================================================
// 脚本分析 API
//=============================================================================

/// 分析脚本，返回诊断结果
///
/// 执行以下检查：
/// - 未使用 `!` 的重复函数定义（Error）
/// - 顶层的 return（Error）
/// - 函数外的 `a:` 引用、引用未声明的参数（Warn）
/// - 函数名不是字典路径却带 dict 标志（Info）
pub fn analyze_script(script: &Script) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();
    let mut defined: HashSet<(bool, &str)> = HashSet::new();

    for (index, unit) in script.units.iter().enumerate() {
        let line = script.line_of(index);

        match unit {
            ScriptUnit::FunctionDeclaration(f) => {
                let key = (f.scope == Some(Scope::Script), f.name.as_str());
                if !defined.insert(key) && !f.replace_existing {
                    result.push(
                        Diagnostic::error(
                            &script.id,
                            format!("函数 {} 重复定义", f.function_name()),
                        )
                        .with_optional_line(line)
                        .with_detail("使用 function! 替换已有定义"),
                    );
                }
                check_function(script, f, line, &mut result);
            }
            ScriptUnit::Return(_) => {
                result.push(
                    Diagnostic::error(&script.id, "return 不在函数内").with_optional_line(line),
                );
            }
            other => {
                check_argument_references(script, other, None, line, &mut result);
            }
        }
    }

    result
}

/// 检查函数声明（递归进入嵌套声明）
fn check_function(
    script: &Script,
    function: &FunctionDeclaration,
    line: Option<usize>,
    result: &mut DiagnosticResult,
) {
    if function.has_flag(FunctionFlag::Dict) && !function.function_name().is_dotted() {
        let name = function.function_name();
        let message = format!("函数 {name} 带 dict 标志，但不是字典函数");
        result.push(
            Diagnostic::info(&script.id, message).with_optional_line(line),
        );
    }

    for unit in &function.body {
        match unit {
            ScriptUnit::FunctionDeclaration(inner) => check_function(script, inner, line, result),
            other => check_argument_references(script, other, Some(function), line, result),
        }
    }
}

/// 检查单元中的 `a:` 引用
fn check_argument_references(
    script: &Script,
    unit: &ScriptUnit,
    function: Option<&FunctionDeclaration>,
    line: Option<usize>,
    result: &mut DiagnosticResult,
) {
    for expr in unit_expressions(unit) {
        expr.visit_variables(&mut |var| {
            if var.scope != Some(Scope::Argument) || var.name == "0" {
                return;
            }
            let message = match function {
                None => format!("函数外引用了参数 a:{}", var.name),
                Some(f) if !f.args.iter().any(|arg| *arg == var.name) => {
                    format!("函数 {} 没有参数 {}", f.function_name(), var.name)
                }
                Some(_) => return,
            };
            result.push(
                Diagnostic::warn(&script.id, message).with_optional_line(line),
            );
        });
    }
}

/// 单元中直接包含的表达式
fn unit_expressions(unit: &ScriptUnit) -> Vec<&Expr> {
    match unit {
        ScriptUnit::Echo(echo) => echo.expressions.iter().collect(),
        ScriptUnit::Return(ret) => vec![&ret.expression],
        ScriptUnit::Let(cmd) => vec![&cmd.value],
        ScriptUnit::Call(cmd) => cmd.call.args.iter().collect(),
        ScriptUnit::FunctionDeclaration(_)
        | ScriptUnit::Unlet(_)
        | ScriptUnit::DelFunction(_)
        | ScriptUnit::Generic(_) => Vec::new(),
    }
}

/// 获取脚本顶层定义的所有函数名（带作用域前缀）
pub fn get_defined_functions(script: &Script) -> Vec<String> {
    script
        .functions()
        .map(|f| f.function_name().to_string())
        .collect()
}
