//! # Executor 模块
//!
//! 执行脚本单元、求值表达式、调用函数。
//!
//! ## 变量解析
//!
//! | 前缀 | 位置 |
//! |------|------|
//! | `g:` | 会话全局变量 |
//! | `s:` | 当前代码所属脚本的命名空间 |
//! | `a:` | 当前调用帧的参数（只读） |
//! | `l:` | 当前调用帧的局部变量 |
//! | 无前缀 | 函数内为局部变量，顶层为全局变量 |
//! | `b:` `w:` `t:` `v:` | 交给宿主 |

use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::error::RuntimeError;
use crate::host::HostContext;
use crate::script::ast::{
    DelFunctionCommand, FunctionDeclaration, FunctionFlag, LetCommand, LetOperator, ScriptUnit,
    UnletCommand,
};
use crate::script::expr::{Expr, FunctionCall, FunctionName, Scope, ScopedVariableRef};
use crate::value::Value;

use super::registry::{DefinedFunction, FunctionKey};
use super::scope::CallFrame;
use super::session::{CallGuard, ExecutionResult, Session};

/// 变量的实际存放位置
enum Slot {
    Global,
    Script(String),
    Argument,
    Local,
    Host(Scope),
}

impl Session {
    /// 执行单个脚本单元
    pub fn execute(
        &mut self,
        unit: &ScriptUnit,
        host: &mut dyn HostContext,
    ) -> Result<ExecutionResult, RuntimeError> {
        trace!(
            unit = unit.kind(),
            script = self.current_script_id(),
            "执行单元"
        );
        match unit {
            ScriptUnit::FunctionDeclaration(declaration) => {
                self.define_function(declaration)?;
            }

            ScriptUnit::Echo(echo) => {
                let mut parts = Vec::with_capacity(echo.expressions.len());
                for expr in &echo.expressions {
                    parts.push(self.evaluate(expr, host)?.to_string());
                }
                host.echo(&parts.join(self.config.echo_separator.as_str()));
            }

            ScriptUnit::Return(ret) => {
                if self.call_stack.is_empty() {
                    return Err(RuntimeError::ReturnOutsideFunction);
                }
                let value = self.evaluate(&ret.expression, host)?;
                return Ok(ExecutionResult::Return(value));
            }

            ScriptUnit::Let(cmd) => self.execute_let(cmd, host)?,

            ScriptUnit::Unlet(cmd) => self.execute_unlet(cmd, host)?,

            ScriptUnit::Call(cmd) => {
                // 返回值被丢弃
                self.call_function(&cmd.call, host)?;
            }

            ScriptUnit::DelFunction(cmd) => self.delete_function(cmd)?,

            ScriptUnit::Generic(cmd) => {
                if let Err(e) = host.execute_command(cmd) {
                    warn!(command = %cmd.name, error = %e, "宿主执行指令失败");
                    return Err(e.into());
                }
            }
        }

        Ok(ExecutionResult::Continue)
    }

    /// 求值表达式
    pub fn evaluate(
        &mut self,
        expr: &Expr,
        host: &mut dyn HostContext,
    ) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(var) => self.read_variable(var, &*host),
            Expr::Concat(left, right) => {
                let left = self.evaluate(left, host)?;
                let right = self.evaluate(right, host)?;
                Ok(left.concat(&right))
            }
            Expr::Call(call) => self.call_function(call, host),
        }
    }

    // =========================================================================
    // 函数
    // =========================================================================

    fn function_key(&self, name: &FunctionName) -> FunctionKey {
        FunctionKey::resolve(name, self.current_script_id())
    }

    fn define_function(&mut self, declaration: &FunctionDeclaration) -> Result<(), RuntimeError> {
        let script_id = self.current_script_id().to_string();
        let name = declaration.function_name();
        let key = FunctionKey::resolve(&name, &script_id);

        let captured = if declaration.has_flag(FunctionFlag::Closure) {
            self.call_stack.last().map(|frame| Rc::clone(&frame.locals))
        } else {
            None
        };

        let function = DefinedFunction {
            declaration: Rc::new(declaration.clone()),
            script_id,
            captured,
        };
        let replaced = self
            .registry
            .define(key, function, declaration.replace_existing)?;

        debug!(function = %name, replaced, "定义函数");
        Ok(())
    }

    fn delete_function(&mut self, cmd: &DelFunctionCommand) -> Result<(), RuntimeError> {
        let key = self.function_key(&cmd.name);
        match self.registry.remove(&key) {
            Some(_) => debug!(function = %cmd.name, "删除函数"),
            None if cmd.bang => {}
            None => {
                return Err(RuntimeError::UnknownFunction {
                    name: cmd.name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// 在调用方的帧中求值实参，然后调用函数
    fn call_function(
        &mut self,
        call: &FunctionCall,
        host: &mut dyn HostContext,
    ) -> Result<Value, RuntimeError> {
        let key = self.function_key(&call.name);
        let function = self.registry.get(&key).cloned().ok_or_else(|| {
            RuntimeError::UnknownFunction {
                name: call.name.to_string(),
            }
        })?;

        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.evaluate(arg, host)?);
        }

        self.invoke(function, args, host)
    }

    /// 调用已解析的函数
    ///
    /// 依次检查 dict 标志、参数个数、调用深度，然后压入调用帧执行函数体。
    /// 函数体内的错误包装为 [`RuntimeError::InFunction`]。
    pub(super) fn invoke(
        &mut self,
        function: DefinedFunction,
        args: Vec<Value>,
        host: &mut dyn HostContext,
    ) -> Result<Value, RuntimeError> {
        let name = function.display_name();
        let declaration = Rc::clone(&function.declaration);

        if declaration.has_flag(FunctionFlag::Dict) {
            return Err(RuntimeError::DictFunctionWithoutDictionary { name });
        }
        if args.len() < declaration.args.len() {
            return Err(RuntimeError::TooFewArguments { name });
        }
        if args.len() > declaration.args.len() {
            return Err(RuntimeError::TooManyArguments { name });
        }
        if self.call_stack.len() >= self.config.max_func_depth {
            return Err(RuntimeError::CallDepthExceeded {
                limit: self.config.max_func_depth,
            });
        }

        let frame = CallFrame::new(
            name.as_str(),
            function.script_id,
            &declaration.args,
            args,
            function.captured,
        );

        debug!(function = %name, depth = self.call_stack.len() + 1, "进入函数");
        let result = {
            let mut session = CallGuard::enter(self, frame);
            session.run_body(&declaration.body, host)
        };
        debug!(function = %name, ok = result.is_ok(), "离开函数");

        result.map_err(|source| RuntimeError::InFunction {
            function: name,
            source: Box::new(source),
        })
    }

    /// 执行函数体，没有 return 时返回 0
    fn run_body(
        &mut self,
        body: &[ScriptUnit],
        host: &mut dyn HostContext,
    ) -> Result<Value, RuntimeError> {
        for unit in body {
            if let ExecutionResult::Return(value) = self.execute(unit, host)? {
                return Ok(value);
            }
        }
        Ok(Value::Number(0))
    }

    // =========================================================================
    // 变量
    // =========================================================================

    fn slot(&self, scope: Option<Scope>) -> Slot {
        let in_function = !self.call_stack.is_empty();
        match scope {
            Some(scope) if scope.is_host_owned() => Slot::Host(scope),
            Some(Scope::Global) => Slot::Global,
            Some(Scope::Script) => Slot::Script(self.current_script_id().to_string()),
            Some(Scope::Argument) => Slot::Argument,
            // 余下只有 `l:` 和无前缀
            Some(_) | None if in_function => Slot::Local,
            Some(_) | None => Slot::Global,
        }
    }

    /// 错误信息中使用的作用域
    fn effective_scope(&self, scope: Option<Scope>) -> Scope {
        match scope {
            Some(scope) => scope,
            None if self.call_stack.is_empty() => Scope::Global,
            None => Scope::Local,
        }
    }

    fn undefined(&self, var: &ScopedVariableRef) -> RuntimeError {
        RuntimeError::UndefinedVariable {
            scope: self.effective_scope(var.scope),
            name: var.name.clone(),
        }
    }

    fn read_variable(
        &self,
        var: &ScopedVariableRef,
        host: &dyn HostContext,
    ) -> Result<Value, RuntimeError> {
        let name = var.name.as_str();
        let value = match self.slot(var.scope) {
            Slot::Global => self.globals.get(name).cloned(),
            Slot::Script(script_id) => self.script_variable(&script_id, name).cloned(),
            Slot::Argument => self
                .call_stack
                .last()
                .and_then(|frame| frame.arguments.get(name).cloned()),
            Slot::Local => self.call_stack.last().and_then(|frame| frame.local(name)),
            Slot::Host(scope) => host.variable(scope, name),
        };
        value.ok_or_else(|| self.undefined(var))
    }

    fn write_variable(
        &mut self,
        var: &ScopedVariableRef,
        value: Value,
        host: &mut dyn HostContext,
    ) -> Result<(), RuntimeError> {
        let name = var.name.as_str();
        match self.slot(var.scope) {
            Slot::Global => self.globals.set(name, value),
            Slot::Script(script_id) => self.scripts.entry(script_id).or_default().set(name, value),
            Slot::Argument => {
                return Err(RuntimeError::ReadOnlyVariable {
                    name: var.to_string(),
                });
            }
            Slot::Local => {
                if let Some(frame) = self.call_stack.last() {
                    frame.set_local(name, value);
                }
            }
            Slot::Host(scope) => host.set_variable(scope, name, value)?,
        }
        Ok(())
    }

    /// 删除变量，返回变量是否存在
    fn remove_variable(
        &mut self,
        var: &ScopedVariableRef,
        host: &mut dyn HostContext,
    ) -> Result<bool, RuntimeError> {
        let name = var.name.as_str();
        let existed = match self.slot(var.scope) {
            Slot::Global => self.globals.remove(name).is_some(),
            Slot::Script(script_id) => self
                .scripts
                .get_mut(&script_id)
                .is_some_and(|frame| frame.remove(name).is_some()),
            Slot::Argument => {
                return Err(RuntimeError::ReadOnlyVariable {
                    name: var.to_string(),
                });
            }
            Slot::Local => self
                .call_stack
                .last()
                .is_some_and(|frame| frame.remove_local(name)),
            Slot::Host(scope) => host.remove_variable(scope, name),
        };
        Ok(existed)
    }

    fn execute_let(
        &mut self,
        cmd: &LetCommand,
        host: &mut dyn HostContext,
    ) -> Result<(), RuntimeError> {
        let value = self.evaluate(&cmd.value, host)?;
        let value = match cmd.operator {
            LetOperator::Assign => value,
            LetOperator::Append => self.read_variable(&cmd.target, &*host)?.concat(&value),
        };
        self.write_variable(&cmd.target, value, host)
    }

    fn execute_unlet(
        &mut self,
        cmd: &UnletCommand,
        host: &mut dyn HostContext,
    ) -> Result<(), RuntimeError> {
        for target in &cmd.targets {
            if !self.remove_variable(target, host)? && !cmd.bang {
                return Err(self.undefined(target));
            }
        }
        Ok(())
    }
}
