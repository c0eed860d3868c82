//! # Config 模块
//!
//! 解释器会话配置。
//!
//! ## 配置优先级
//!
//! 1. 调用方显式构造的值（最高）
//! 2. 配置文件 (JSON)
//! 3. 默认值（最低）

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// 会话配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 函数调用的最大嵌套深度（对应 Vim 的 `'maxfuncdepth'`）
    #[serde(default = "default_max_func_depth")]
    pub max_func_depth: usize,

    /// echo 多个表达式时的分隔符
    #[serde(default = "default_echo_separator")]
    pub echo_separator: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_func_depth: default_max_func_depth(),
            echo_separator: default_echo_separator(),
        }
    }
}

fn default_max_func_depth() -> usize {
    100
}

fn default_echo_separator() -> String {
    " ".to_string()
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("配置验证失败: {0}")]
    Invalid(String),
}

impl SessionConfig {
    /// 从 JSON 文本解析配置，缺省字段取默认值
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并记录警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match Self::from_json_str(&content) {
                Ok(config) => {
                    debug!(path = %path.display(), "配置文件加载成功");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "配置文件无效，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_func_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_func_depth 必须大于 0".to_string(),
            ));
        }
        Ok(())
    }
}
