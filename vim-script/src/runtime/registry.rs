//! # Registry 模块
//!
//! 已定义函数的注册表。
//!
//! `s:` 函数以 (定义脚本, 名称) 为键，各脚本互不可见；其余函数都是全局的。

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::script::ast::FunctionDeclaration;
use crate::script::expr::{FunctionName, Scope};

use super::scope::SharedFrame;

/// 注册表键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunctionKey {
    /// 全局函数（含 `g:` 前缀和无前缀的函数）
    Global(String),
    /// 脚本局部函数
    Script { script_id: String, name: String },
}

impl FunctionKey {
    /// 在指定脚本中解析函数名
    pub fn resolve(name: &FunctionName, script_id: &str) -> Self {
        match name.scope {
            Some(Scope::Script) => Self::Script {
                script_id: script_id.to_string(),
                name: name.name.clone(),
            },
            _ => Self::Global(name.name.clone()),
        }
    }
}

/// 已定义的函数
#[derive(Debug, Clone)]
pub struct DefinedFunction {
    pub declaration: Rc<FunctionDeclaration>,
    /// 定义该函数的脚本
    pub script_id: String,
    /// closure 函数定义时捕获的外层局部变量帧
    pub captured: Option<SharedFrame>,
}

impl DefinedFunction {
    /// 显示名（带作用域前缀）
    pub fn display_name(&self) -> String {
        self.declaration.function_name().to_string()
    }
}

/// 函数注册表
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<FunctionKey, DefinedFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册函数
    ///
    /// 同名函数已存在且 `replace` 为 false 时报 `FunctionAlreadyDefined`。
    /// 返回是否替换了旧定义。
    pub fn define(
        &mut self,
        key: FunctionKey,
        function: DefinedFunction,
        replace: bool,
    ) -> Result<bool, RuntimeError> {
        if !replace && self.functions.contains_key(&key) {
            return Err(RuntimeError::FunctionAlreadyDefined {
                name: function.display_name(),
            });
        }
        Ok(self.functions.insert(key, function).is_some())
    }

    pub fn get(&self, key: &FunctionKey) -> Option<&DefinedFunction> {
        self.functions.get(key)
    }

    pub fn remove(&mut self, key: &FunctionKey) -> Option<DefinedFunction> {
        self.functions.remove(key)
    }

    pub fn contains(&self, key: &FunctionKey) -> bool {
        self.functions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
