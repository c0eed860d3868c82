//! # Value 模块
//!
//! 脚本运行时的值类型。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 脚本变量值
///
/// 只覆盖函数声明与 echo/return 用到的两种基本类型。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// 字符串
    String(String),
    /// 整数
    Number(i64),
}

impl Value {
    /// 创建字符串值
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// 创建整数值
    pub fn number(n: i64) -> Self {
        Self::Number(n)
    }

    /// 字符串连接（`.` / `..`）
    ///
    /// 数字按十进制转换为字符串后参与连接。
    pub fn concat(&self, other: &Value) -> Value {
        Value::String(format!("{self}{other}"))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}
