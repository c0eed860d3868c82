//! # Session 模块
//!
//! 解释器会话：持有函数注册表、全局变量、各脚本的 `s:` 命名空间和调用栈。
//!
//! 会话是显式持有的普通值，不存在隐式全局状态。

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use tracing::debug;

use crate::config::SessionConfig;
use crate::error::RuntimeError;
use crate::host::HostContext;
use crate::script::ast::Script;
use crate::value::Value;

use super::registry::{FunctionKey, FunctionRegistry};
use super::scope::{CallFrame, ScopeFrame};

/// 不属于任何脚本时使用的脚本标识（直接执行的单元）
pub const COMMAND_LINE_SCRIPT: &str = "<cmdline>";

/// 单元执行结果
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// 继续执行下一个单元
    Continue,
    /// 从当前函数返回
    Return(Value),
}

/// 解释器会话
#[derive(Debug, Default)]
pub struct Session {
    pub(super) config: SessionConfig,
    /// `g:` 变量
    pub(super) globals: ScopeFrame,
    /// 各脚本的 `s:` 变量
    pub(super) scripts: HashMap<String, ScopeFrame>,
    pub(super) registry: FunctionRegistry,
    pub(super) call_stack: Vec<CallFrame>,
    /// 正在 source 的脚本（嵌套 source 时栈顶为当前脚本）
    pub(super) sourcing: Vec<String>,
}

impl Session {
    /// 使用默认配置创建会话
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// 执行脚本的全部顶层单元
    ///
    /// 遇到第一个错误即停止，已执行单元的效果保留。
    pub fn source(
        &mut self,
        script: &Script,
        host: &mut dyn HostContext,
    ) -> Result<(), RuntimeError> {
        debug!(script = %script.id, units = script.len(), "source 脚本");
        let mut session = SourceGuard::enter(self, &script.id);
        for unit in &script.units {
            session.execute(unit, host)?;
        }
        Ok(())
    }

    /// 按名称调用全局函数（可带 `g:` 前缀）
    pub fn call(
        &mut self,
        name: &str,
        args: Vec<Value>,
        host: &mut dyn HostContext,
    ) -> Result<Value, RuntimeError> {
        let bare = name.strip_prefix("g:").unwrap_or(name);
        let function = self
            .registry
            .get(&FunctionKey::Global(bare.to_string()))
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownFunction {
                name: name.to_string(),
            })?;
        self.invoke(function, args, host)
    }

    /// 是否定义了指定的全局函数
    pub fn has_function(&self, name: &str) -> bool {
        let bare = name.strip_prefix("g:").unwrap_or(name);
        self.registry
            .contains(&FunctionKey::Global(bare.to_string()))
    }

    /// 是否在指定脚本中定义了 `s:` 函数
    pub fn has_script_function(&self, script_id: &str, name: &str) -> bool {
        self.registry.contains(&FunctionKey::Script {
            script_id: script_id.to_string(),
            name: name.to_string(),
        })
    }

    /// 已注册函数数量
    pub fn function_count(&self) -> usize {
        self.registry.len()
    }

    pub fn global_variable(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn set_global_variable(&mut self, name: &str, value: impl Into<Value>) {
        self.globals.set(name, value.into());
    }

    pub fn script_variable(&self, script_id: &str, name: &str) -> Option<&Value> {
        self.scripts.get(script_id)?.get(name)
    }

    /// 当前调用深度
    pub fn call_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// 当前代码所属的脚本
    ///
    /// 函数内为定义该函数的脚本，否则为正在 source 的脚本。
    pub fn current_script_id(&self) -> &str {
        self.call_stack
            .last()
            .map(|frame| frame.script_id.as_str())
            .or_else(|| self.sourcing.last().map(String::as_str))
            .unwrap_or(COMMAND_LINE_SCRIPT)
    }
}

/// 调用帧守卫
///
/// 进入时压入调用帧，离开作用域时弹出，正常返回和出错都会释放。
pub(super) struct CallGuard<'s> {
    session: &'s mut Session,
}

impl<'s> CallGuard<'s> {
    pub fn enter(session: &'s mut Session, frame: CallFrame) -> Self {
        session.call_stack.push(frame);
        Self { session }
    }
}

impl Deref for CallGuard<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.session
    }
}

impl DerefMut for CallGuard<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        self.session
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.session.call_stack.pop();
    }
}

/// source 守卫，语义同 [`CallGuard`]
struct SourceGuard<'s> {
    session: &'s mut Session,
}

impl<'s> SourceGuard<'s> {
    fn enter(session: &'s mut Session, script_id: &str) -> Self {
        session.sourcing.push(script_id.to_string());
        Self { session }
    }
}

impl Deref for SourceGuard<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.session
    }
}

impl DerefMut for SourceGuard<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        self.session
    }
}

impl Drop for SourceGuard<'_> {
    fn drop(&mut self) {
        self.session.sourcing.pop();
    }
}
