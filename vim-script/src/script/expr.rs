//! # 表达式模块
//!
//! 定义表达式 AST 以及作用域前缀。
//!
//! ## 支持的语法
//!
//! - 字符串字面量: `'single'`, `"double\n"`
//! - 数字字面量: `42`
//! - 变量: `name`, `g:name`, `s:name`, `a:name`, `l:name`, `b:` / `w:` / `t:` / `v:`
//! - 连接: `expr . expr`, `expr .. expr`（左结合，最低优先级）
//! - 函数调用: `Name(arg, ...)`, `s:Name(...)`
//! - 括号: `(expr)`

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::Value;

/// 变量 / 函数的作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    /// `g:` 全局
    Global,
    /// `s:` 脚本局部
    Script,
    /// `a:` 函数参数
    Argument,
    /// `l:` 函数局部
    Local,
    /// `b:` 缓冲区
    Buffer,
    /// `w:` 窗口
    Window,
    /// `t:` 标签页
    Tab,
    /// `v:` Vim 预定义变量
    Vim,
}

impl Scope {
    /// 由前缀字母解析作用域（`g` → Global）
    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            'g' => Some(Self::Global),
            's' => Some(Self::Script),
            'a' => Some(Self::Argument),
            'l' => Some(Self::Local),
            'b' => Some(Self::Buffer),
            'w' => Some(Self::Window),
            't' => Some(Self::Tab),
            'v' => Some(Self::Vim),
            _ => None,
        }
    }

    /// 带冒号的前缀，如 `"g:"`
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Global => "g:",
            Self::Script => "s:",
            Self::Argument => "a:",
            Self::Local => "l:",
            Self::Buffer => "b:",
            Self::Window => "w:",
            Self::Tab => "t:",
            Self::Vim => "v:",
        }
    }

    /// 是否由宿主提供存储（编辑器侧的命名空间）
    pub fn is_host_owned(self) -> bool {
        matches!(self, Self::Buffer | Self::Window | Self::Tab | Self::Vim)
    }
}

/// 带作用域的变量引用
///
/// `scope` 为 `None` 表示未写前缀，在求值时才决定作用域。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedVariableRef {
    pub scope: Option<Scope>,
    pub name: String,
}

impl ScopedVariableRef {
    pub fn new(scope: Option<Scope>, name: impl Into<String>) -> Self {
        Self {
            scope,
            name: name.into(),
        }
    }
}

impl fmt::Display for ScopedVariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scope) = self.scope {
            f.write_str(scope.prefix())?;
        }
        f.write_str(&self.name)
    }
}

/// 函数名
///
/// 普通函数名不含前缀（`s:Initialize` → scope = Script, name = `Initialize`）；
/// 字典函数保留完整的点分路径（`s:dict.something.Initialize`）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionName {
    pub scope: Option<Scope>,
    pub name: String,
}

impl FunctionName {
    pub fn new(scope: Option<Scope>, name: impl Into<String>) -> Self {
        Self {
            scope,
            name: name.into(),
        }
    }

    /// 是否是字典成员函数（点分路径）
    pub fn is_dotted(&self) -> bool {
        self.name.contains('.')
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Some(scope) if !self.is_dotted() => write!(f, "{}{}", scope.prefix(), self.name),
            _ => f.write_str(&self.name),
        }
    }
}

/// 函数调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: FunctionName,
    pub args: Vec<Expr>,
}

/// 表达式 AST 节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// 字面量（字符串或数字）
    Literal(Value),

    /// 变量引用
    Variable(ScopedVariableRef),

    /// 字符串连接
    Concat(Box<Expr>, Box<Expr>),

    /// 函数调用
    Call(FunctionCall),
}

impl Expr {
    /// 创建字符串字面量
    pub fn string(s: impl Into<String>) -> Self {
        Self::Literal(Value::String(s.into()))
    }

    /// 创建数字字面量
    pub fn number(n: i64) -> Self {
        Self::Literal(Value::Number(n))
    }

    /// 创建变量引用
    pub fn var(scope: Option<Scope>, name: impl Into<String>) -> Self {
        Self::Variable(ScopedVariableRef::new(scope, name))
    }

    /// 创建连接表达式
    pub fn concat(left: Expr, right: Expr) -> Self {
        Self::Concat(Box::new(left), Box::new(right))
    }

    /// 创建函数调用
    pub fn call(name: FunctionName, args: Vec<Expr>) -> Self {
        Self::Call(FunctionCall { name, args })
    }

    /// 深度优先遍历所有变量引用
    pub fn visit_variables<'a>(&'a self, visit: &mut impl FnMut(&'a ScopedVariableRef)) {
        match self {
            Self::Literal(_) => {}
            Self::Variable(var) => visit(var),
            Self::Concat(left, right) => {
                left.visit_variables(visit);
                right.visit_variables(visit);
            }
            Self::Call(call) => {
                for arg in &call.args {
                    arg.visit_variables(visit);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_prefix_roundtrip() {
        for c in ['g', 's', 'a', 'l', 'b', 'w', 't', 'v'] {
            let scope = Scope::from_prefix(c).unwrap();
            assert_eq!(scope.prefix(), format!("{c}:"));
        }
        assert_eq!(Scope::from_prefix('x'), None);
        assert!(Scope::Vim.is_host_owned());
        assert!(!Scope::Local.is_host_owned());
    }

    #[test]
    fn test_function_name_display() {
        assert_eq!(
            FunctionName::new(Some(Scope::Script), "Initialize").to_string(),
            "s:Initialize"
        );
        assert_eq!(
            FunctionName::new(None, "helloWorld").to_string(),
            "helloWorld"
        );
        assert_eq!(
            FunctionName::new(Some(Scope::Script), "s:dict.something.Initialize").to_string(),
            "s:dict.something.Initialize"
        );
    }

    #[test]
    fn test_visit_variables() {
        let expr = Expr::concat(
            Expr::var(Some(Scope::Argument), "cmd"),
            Expr::call(
                FunctionName::new(None, "F"),
                vec![Expr::var(None, "x"), Expr::string("y")],
            ),
        );
        let mut names = Vec::new();
        expr.visit_variables(&mut |v| names.push(v.to_string()));
        assert_eq!(names, vec!["a:cmd", "x"]);
    }
}
