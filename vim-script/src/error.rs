//! # Error 模块
//!
//! 定义 vim-script 中使用的错误类型。
//!
//! - [`LexError`]：词法错误，只影响出错的那一行
//! - [`ParseError`]：语法错误，带行号和列号
//! - [`RuntimeError`]：执行错误，沿调用栈向上传播
//! - [`ScriptError`]：统一错误类型

use thiserror::Error;

use crate::host::HostError;
use crate::script::Scope;

/// 词法错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    /// 字符串字面量未闭合
    #[error("第 {line} 行第 {column} 列：字符串字面量未闭合，缺少 {quote}")]
    UnterminatedString {
        line: usize,
        column: usize,
        quote: char,
    },

    /// 无法识别的字符
    #[error("第 {line} 行第 {column} 列：无法识别的字符 '{found}'")]
    UnexpectedCharacter {
        line: usize,
        column: usize,
        found: char,
    },
}

impl LexError {
    /// 出错的行号（从 1 开始）
    pub fn line(&self) -> usize {
        match self {
            Self::UnterminatedString { line, .. } | Self::UnexpectedCharacter { line, .. } => *line,
        }
    }
}

/// 解析错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// 词法错误
    #[error(transparent)]
    Lex(#[from] LexError),

    /// 当前位置无法开始一个表达式
    #[error("第 {line} 行第 {column} 列：无法解析表达式 - {message}")]
    Expression {
        line: usize,
        column: usize,
        message: String,
    },

    /// 未知的函数标志
    #[error("第 {line} 行第 {column} 列：未知的函数标志 '{flag}'")]
    UnknownFunctionFlag {
        line: usize,
        column: usize,
        flag: String,
    },

    /// 函数体缺少 endfunction
    #[error("第 {line} 行：函数 '{name}' 缺少 endfunction")]
    UnterminatedFunction { line: usize, name: String },

    /// 无效的函数名
    #[error("第 {line} 行第 {column} 列：无效的函数名 - {message}")]
    InvalidFunctionName {
        line: usize,
        column: usize,
        message: String,
    },

    /// 缺少期望的记号
    #[error("第 {line} 行第 {column} 列：期望 {expected}，实际为 {found}")]
    ExpectedToken {
        line: usize,
        column: usize,
        expected: String,
        found: String,
    },

    /// 没有对应 function 的 endfunction
    #[error("第 {line} 行：endfunction 没有对应的 function")]
    UnexpectedEndFunction { line: usize },

    /// 省略表达式的 return（暂不支持）
    #[error("第 {line} 行：不支持省略表达式的 return")]
    ReturnWithoutExpression { line: usize },

    /// 语句结束后仍有多余内容
    #[error("第 {line} 行第 {column} 列：多余的内容 '{text}'")]
    TrailingCharacters {
        line: usize,
        column: usize,
        text: String,
    },

    /// 指令缺少必需参数
    #[error("第 {line} 行：指令 '{command}' 缺少参数")]
    MissingArgument { line: usize, command: String },

    /// 指令不接受行范围
    #[error("第 {line} 行：指令 '{command}' 不接受行范围")]
    RangeNotAllowed { line: usize, command: String },

    /// 表达式或函数声明嵌套过深
    #[error("第 {line} 行第 {column} 列：嵌套层数超过上限 {limit}")]
    NestingTooDeep {
        line: usize,
        column: usize,
        limit: usize,
    },
}

impl ParseError {
    /// 出错的行号（从 1 开始）
    pub fn line(&self) -> usize {
        match self {
            Self::Lex(e) => e.line(),
            Self::Expression { line, .. }
            | Self::UnknownFunctionFlag { line, .. }
            | Self::UnterminatedFunction { line, .. }
            | Self::InvalidFunctionName { line, .. }
            | Self::ExpectedToken { line, .. }
            | Self::UnexpectedEndFunction { line }
            | Self::ReturnWithoutExpression { line }
            | Self::TrailingCharacters { line, .. }
            | Self::MissingArgument { line, .. }
            | Self::RangeNotAllowed { line, .. }
            | Self::NestingTooDeep { line, .. } => *line,
        }
    }
}

/// 运行时错误
///
/// 错误码沿用 Vim 的编号，便于用户对照文档。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// 同名函数已存在且未使用 `!`
    #[error("E122: 函数 {name} 已存在，请使用 ! 替换")]
    FunctionAlreadyDefined { name: String },

    /// 变量未定义
    #[error("E121: 未定义的变量: {}{name}", .scope.prefix())]
    UndefinedVariable { scope: Scope, name: String },

    /// 函数外的 return
    #[error("E133: :return 不在函数内")]
    ReturnOutsideFunction,

    /// 函数未定义
    #[error("E117: 未知函数: {name}")]
    UnknownFunction { name: String },

    /// 实参过多
    #[error("E118: 函数 {name} 的参数过多")]
    TooManyArguments { name: String },

    /// 实参不足
    #[error("E119: 函数 {name} 的参数不足")]
    TooFewArguments { name: String },

    /// 调用深度超过 max_func_depth
    #[error("E132: 函数调用深度超过上限 {limit}")]
    CallDepthExceeded { limit: usize },

    /// 只读变量
    #[error("E46: 不能修改只读变量 {name}")]
    ReadOnlyVariable { name: String },

    /// 没有字典上下文就调用 dict 函数
    #[error("E725: 调用 dict 函数 {name} 时没有字典")]
    DictFunctionWithoutDictionary { name: String },

    /// 宿主执行失败
    #[error("宿主执行失败: {0}")]
    Host(#[from] HostError),

    /// 在函数内部发生的错误
    #[error("处理函数 {function} 时出错: {source}")]
    InFunction {
        function: String,
        #[source]
        source: Box<RuntimeError>,
    },
}

impl RuntimeError {
    /// 剥去 [`RuntimeError::InFunction`] 包装，返回最初的错误
    pub fn root(&self) -> &RuntimeError {
        match self {
            Self::InFunction { source, .. } => source.root(),
            other => other,
        }
    }

    /// 错误发生时的函数调用链（外层在前）
    pub fn call_trace(&self) -> Vec<&str> {
        let mut trace = Vec::new();
        let mut current = self;
        while let Self::InFunction { function, source } = current {
            trace.push(function.as_str());
            current = source.as_ref();
        }
        trace
    }
}

/// vim-script 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(#[from] ParseError),

    /// 运行时错误
    #[error("运行时错误: {0}")]
    Runtime(#[from] RuntimeError),
}

impl From<LexError> for ScriptError {
    fn from(e: LexError) -> Self {
        Self::Parse(ParseError::Lex(e))
    }
}

/// Result 类型别名
pub type ScriptResult<T> = Result<T, ScriptError>;
