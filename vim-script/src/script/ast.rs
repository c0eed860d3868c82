//! # AST 模块
//!
//! 定义脚本的抽象语法树（Abstract Syntax Tree）。
//!
//! ## 设计说明
//!
//! AST 是解析器的输出。注释行和空行在解析阶段被丢弃，不会出现在 AST 中；
//! 函数体不包含 endfunction 本身。执行引擎按顺序遍历 [`ScriptUnit`]。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::expr::{Expr, FunctionCall, FunctionName, Scope, ScopedVariableRef};

/// 函数标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FunctionFlag {
    /// `range`：函数自行处理行范围
    Range,
    /// `abort`：遇到错误立即中止
    Abort,
    /// `dict`：只能通过字典调用
    Dict,
    /// `closure`：捕获外层函数的局部变量
    Closure,
}

impl FunctionFlag {
    /// 由关键字解析标志（必须完整拼写）
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "range" => Some(Self::Range),
            "abort" => Some(Self::Abort),
            "dict" => Some(Self::Dict),
            "closure" => Some(Self::Closure),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Range => "range",
            Self::Abort => "abort",
            Self::Dict => "dict",
            Self::Closure => "closure",
        }
    }
}

/// 函数声明
///
/// 对应 `function[!] {name}({args}) [flags]` ... `endfunction`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    /// 函数名（字典函数为完整点分路径）
    pub name: String,
    /// 声明时的作用域前缀，None 表示在调用处解析
    pub scope: Option<Scope>,
    /// 形参名（按声明顺序）
    pub args: Vec<String>,
    /// 标志集合（与书写顺序、重复次数无关）
    pub flags: BTreeSet<FunctionFlag>,
    /// 函数体
    pub body: Vec<ScriptUnit>,
    /// 是否使用了 `!`
    pub replace_existing: bool,
}

impl FunctionDeclaration {
    /// 声明对应的函数名
    pub fn function_name(&self) -> FunctionName {
        FunctionName::new(self.scope, self.name.clone())
    }

    pub fn has_flag(&self, flag: FunctionFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// echo 指令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoCommand {
    pub expressions: Vec<Expr>,
}

/// return 语句
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatement {
    pub expression: Expr,
}

/// let 赋值运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LetOperator {
    /// `=`
    Assign,
    /// `.=`
    Append,
}

/// let 指令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetCommand {
    pub target: ScopedVariableRef,
    pub operator: LetOperator,
    pub value: Expr,
}

/// unlet 指令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnletCommand {
    /// `unlet!`：变量不存在时不报错
    pub bang: bool,
    pub targets: Vec<ScopedVariableRef>,
}

/// call 指令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallCommand {
    /// 行范围（原样保留，由宿主解释）
    pub range: Option<String>,
    pub call: FunctionCall,
}

/// delfunction 指令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelFunctionCommand {
    /// `delfunction!`：函数不存在时不报错
    pub bang: bool,
    pub name: FunctionName,
}

/// 其他 Ex 指令
///
/// 解释器不理解其语义，原样交给宿主执行。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericCommand {
    /// 行范围（如 `%`、`1,3`、`'<,'>`）
    pub range: Option<String>,
    /// 指令名（如 `set`、`normal`、`!`）
    pub name: String,
    /// 是否带 `!`
    pub bang: bool,
    /// 参数原文
    pub args: String,
}

/// 脚本单元
///
/// 表示脚本或函数体中的一个执行单元，顺序有意义。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScriptUnit {
    FunctionDeclaration(FunctionDeclaration),
    Echo(EchoCommand),
    Return(ReturnStatement),
    Let(LetCommand),
    Unlet(UnletCommand),
    Call(CallCommand),
    DelFunction(DelFunctionCommand),
    Generic(GenericCommand),
}

impl ScriptUnit {
    /// 单元种类名称（用于日志和诊断）
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FunctionDeclaration(_) => "function",
            Self::Echo(_) => "echo",
            Self::Return(_) => "return",
            Self::Let(_) => "let",
            Self::Unlet(_) => "unlet",
            Self::Call(_) => "call",
            Self::DelFunction(_) => "delfunction",
            Self::Generic(_) => "command",
        }
    }
}

/// 解析后的脚本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// 脚本标识符（通常是文件路径）
    pub id: String,
    /// 顶层脚本单元
    pub units: Vec<ScriptUnit>,
    /// 每个顶层单元的起始行号（从 1 开始），与 `units` 一一对应
    #[serde(default)]
    pub source_map: Vec<usize>,
}

impl Script {
    /// 创建新脚本
    pub fn new(id: impl Into<String>, units: Vec<ScriptUnit>) -> Self {
        Self {
            id: id.into(),
            units,
            source_map: Vec::new(),
        }
    }

    /// 创建带行号映射的脚本
    pub fn with_source_map(
        id: impl Into<String>,
        units: Vec<ScriptUnit>,
        source_map: Vec<usize>,
    ) -> Self {
        Self {
            id: id.into(),
            units,
            source_map,
        }
    }

    /// 解析脚本文本（严格模式）
    pub fn parse(id: &str, text: &str) -> Result<Self, crate::error::ParseError> {
        super::Parser::new().parse(id, text)
    }

    /// 获取顶层单元的源码行号
    pub fn line_of(&self, index: usize) -> Option<usize> {
        self.source_map.get(index).copied()
    }

    /// 顶层单元数量
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// 顶层声明的所有函数
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDeclaration> {
        self.units.iter().filter_map(|unit| match unit {
            ScriptUnit::FunctionDeclaration(f) => Some(f),
            _ => None,
        })
    }
}
