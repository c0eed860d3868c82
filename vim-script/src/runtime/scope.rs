//! # Scope 模块
//!
//! 变量作用域帧与函数调用帧。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// 变量作用域帧（名称 → 值）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeFrame {
    variables: HashMap<String, Value>,
}

impl ScopeFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.variables.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// 可被闭包共享的局部变量帧
pub type SharedFrame = Rc<RefCell<ScopeFrame>>;

/// 函数调用帧
///
/// 每次调用压栈一个，调用结束（无论成功与否）时弹出。
#[derive(Debug)]
pub struct CallFrame {
    /// 函数显示名（用于错误信息）
    pub function: String,
    /// 定义该函数的脚本，`s:` 在此脚本的命名空间中解析
    pub script_id: String,
    /// `a:` 参数帧
    pub arguments: ScopeFrame,
    /// `l:` 局部变量帧
    pub locals: SharedFrame,
    /// closure 函数捕获的外层局部变量帧
    pub closure: Option<SharedFrame>,
}

impl CallFrame {
    /// 创建调用帧，按形参顺序绑定实参
    ///
    /// 调用前需保证实参个数与形参一致。
    pub fn new(
        function: impl Into<String>,
        script_id: impl Into<String>,
        params: &[String],
        args: Vec<Value>,
        closure: Option<SharedFrame>,
    ) -> Self {
        let mut arguments = ScopeFrame::new();
        for (param, value) in params.iter().zip(args) {
            arguments.set(param.as_str(), value);
        }
        // 不支持可变参数，额外参数个数恒为 0
        arguments.set("0", Value::Number(0));

        Self {
            function: function.into(),
            script_id: script_id.into(),
            arguments,
            locals: Rc::new(RefCell::new(ScopeFrame::new())),
            closure,
        }
    }

    /// 读取局部变量，找不到时回退到捕获的外层帧
    pub fn local(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.locals.borrow().get(name) {
            return Some(value.clone());
        }
        self.closure
            .as_ref()
            .and_then(|outer| outer.borrow().get(name).cloned())
    }

    /// 写入局部变量
    ///
    /// 变量只存在于捕获的外层帧时写回外层帧。
    pub fn set_local(&self, name: &str, value: Value) {
        if let Some(outer) = &self.closure {
            let shadowed = self.locals.borrow().contains(name);
            let captured = outer.borrow().contains(name);
            if captured && !shadowed {
                outer.borrow_mut().set(name, value);
                return;
            }
        }
        self.locals.borrow_mut().set(name, value);
    }

    /// 删除局部变量，返回变量是否存在
    pub fn remove_local(&self, name: &str) -> bool {
        if self.locals.borrow_mut().remove(name).is_some() {
            return true;
        }
        self.closure
            .as_ref()
            .is_some_and(|outer| outer.borrow_mut().remove(name).is_some())
    }
}
