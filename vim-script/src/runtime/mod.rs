//! # Runtime 模块
//!
//! 解释器核心，负责执行脚本单元和管理作用域。
//!
//! ## 模块结构
//!
//! - [`session`]：解释器会话与调用帧守卫
//! - [`executor`]：单元执行、表达式求值、函数调用
//! - [`registry`]：函数注册表
//! - [`scope`]：变量作用域帧与调用帧

pub mod executor;
pub mod registry;
pub mod scope;
pub mod session;

pub use registry::{DefinedFunction, FunctionKey, FunctionRegistry};
pub use scope::{CallFrame, ScopeFrame};
pub use session::{COMMAND_LINE_SCRIPT, ExecutionResult, Session};
