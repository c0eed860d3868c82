//! # Vim Script
//!
//! Vim script 子集的词法分析、解析与解释执行。
//!
//! ## 架构概述
//!
//! `vim-script` 是纯逻辑核心，不依赖编辑器。
//! 它通过 [`HostContext`] 与宿主通信：
//!
//! ```text
//! 脚本文本 ──► Parser ──► Script ──► Session::source ──► HostContext
//!                                                        (echo / 普通指令 / b: w: t: v:)
//! ```
//!
//! ## 支持的语法
//!
//! - `function[!] ... endfunction`（含 `range` / `abort` / `dict` / `closure` 标志）
//! - `echo`、`return`、`let`、`unlet`、`call`、`delfunction`
//! - 其余 Ex 指令原样交给宿主
//!
//! ## 使用示例
//!
//! ```ignore
//! use vim_script::{RecordingHost, Script, Session};
//!
//! let script = Script::parse("hello.vim", "function Hi()\necho 'hi'\nendfunction\ncall Hi()")?;
//! let mut session = Session::new();
//! let mut host = RecordingHost::new();
//! session.source(&script, &mut host)?;
//! assert_eq!(host.messages, vec!["hi"]);
//! ```
//!
//! ## 模块结构
//!
//! - [`script`]：词法分析、AST 和 Parser
//! - [`runtime`]：解释器会话
//! - [`host`]：宿主接口
//! - [`diagnostic`]：静态检查
//! - [`config`]：会话配置
//! - [`error`]：错误类型定义
//! - [`value`]：运行时值

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod host;
pub mod runtime;
pub mod script;
pub mod value;

// 重导出核心类型
pub use config::{ConfigError, SessionConfig};
pub use diagnostic::{
    Diagnostic, DiagnosticLevel, DiagnosticResult, analyze_script, get_defined_functions,
};
pub use error::{LexError, ParseError, RuntimeError, ScriptError, ScriptResult};
pub use host::{HostContext, HostError, RecordingHost};
pub use runtime::{ExecutionResult, Session};
pub use script::{
    Expr, FunctionDeclaration, FunctionFlag, FunctionName, GenericCommand, Parser, Scope, Script,
    ScriptUnit,
};
pub use value::Value;
