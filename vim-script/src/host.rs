//! # Host 模块
//!
//! 解释器与宿主（编辑器）之间的接口。
//!
//! 解释器只理解函数、变量和 echo；其余 Ex 指令以及 `b:` / `w:` / `t:` / `v:`
//! 作用域的变量都交给宿主处理。

use std::collections::HashMap;

use thiserror::Error;

use crate::script::ast::GenericCommand;
use crate::script::expr::Scope;
use crate::value::Value;

/// 宿主返回的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    /// 宿主不支持该指令
    #[error("E492: 不是编辑器命令: {name}")]
    UnsupportedCommand { name: String },

    /// 宿主拒绝修改变量
    #[error("E46: 不能修改只读变量 {name}")]
    ReadOnlyVariable { name: String },

    /// 其他失败
    #[error("{0}")]
    Failed(String),
}

/// 宿主上下文
///
/// 解释器通过该 trait 输出消息、执行普通指令、访问宿主持有的变量。
pub trait HostContext {
    /// 输出 echo 消息
    fn echo(&mut self, message: &str);

    /// 执行解释器不理解的 Ex 指令
    fn execute_command(&mut self, command: &GenericCommand) -> Result<(), HostError>;

    /// 读取宿主持有的变量（`b:` / `w:` / `t:` / `v:`）
    fn variable(&self, scope: Scope, name: &str) -> Option<Value>;

    /// 写入宿主持有的变量
    fn set_variable(&mut self, scope: Scope, name: &str, value: Value) -> Result<(), HostError>;

    /// 删除宿主持有的变量，返回变量是否存在
    fn remove_variable(&mut self, scope: Scope, name: &str) -> bool;
}

/// 记录型宿主
///
/// 把所有输出和指令保存在内存中，用于测试和无界面运行。
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    /// echo 输出（按顺序）
    pub messages: Vec<String>,
    /// 收到的普通指令（按顺序）
    pub commands: Vec<GenericCommand>,
    variables: HashMap<(Scope, String), Value>,
    /// 拒绝执行的指令名
    rejected: Vec<String>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置宿主变量
    pub fn with_variable(mut self, scope: Scope, name: &str, value: impl Into<Value>) -> Self {
        let key = (scope, name.to_string());
        self.variables.insert(key, value.into());
        self
    }

    /// 让指定名称的指令执行失败
    pub fn rejecting(mut self, command: &str) -> Self {
        self.rejected.push(command.to_string());
        self
    }
}

impl HostContext for RecordingHost {
    fn echo(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn execute_command(&mut self, command: &GenericCommand) -> Result<(), HostError> {
        if self.rejected.iter().any(|name| *name == command.name) {
            return Err(HostError::UnsupportedCommand {
                name: command.name.clone(),
            });
        }
        self.commands.push(command.clone());
        Ok(())
    }

    fn variable(&self, scope: Scope, name: &str) -> Option<Value> {
        self.variables.get(&(scope, name.to_string())).cloned()
    }

    fn set_variable(&mut self, scope: Scope, name: &str, value: Value) -> Result<(), HostError> {
        if scope == Scope::Vim {
            return Err(HostError::ReadOnlyVariable {
                name: format!("{}{name}", scope.prefix()),
            });
        }
        self.variables.insert((scope, name.to_string()), value);
        Ok(())
    }

    fn remove_variable(&mut self, scope: Scope, name: &str) -> bool {
        self.variables.remove(&(scope, name.to_string())).is_some()
    }
}
