//! # host-cli - 命令行宿主
//!
//! 在终端中 source 一个或多个 Vim 脚本：`echo` 输出到 stdout，
//! 解释器不理解的 Ex 指令只记录日志。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p host-cli -- plugin.vim
//! cargo run -p host-cli -- --config session.json -vv a.vim b.vim
//! cargo run -p host-cli -- --check scripts/*.vim
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing::{Level, debug, error, info};
use vim_script::{
    Diagnostic, DiagnosticResult, GenericCommand, HostContext, HostError, Parser as ScriptParser,
    Scope, Session, SessionConfig, Value, analyze_script,
};

#[derive(Parser)]
#[command(name = "host-cli")]
#[command(about = "Vim 脚本解释器 - 在终端中 source 脚本")]
#[command(version)]
struct Cli {
    /// 会话配置文件（JSON）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 日志详细程度（-v: info，-vv: debug，-vvv: trace）
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// 只做静态检查，不执行
    #[arg(long)]
    check: bool,

    /// 要 source 的脚本文件（按顺序共享同一个会话）
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

/// 终端宿主
///
/// `b:` / `w:` / `t:` / `v:` 变量保存在内存里，`v:` 只读。
#[derive(Default)]
struct TerminalHost {
    variables: HashMap<(Scope, String), Value>,
}

impl HostContext for TerminalHost {
    fn echo(&mut self, message: &str) {
        println!("{message}");
    }

    fn execute_command(&mut self, command: &GenericCommand) -> Result<(), HostError> {
        info!(
            command = %command.name,
            bang = command.bang,
            range = command.range.as_deref().unwrap_or(""),
            args = %command.args,
            "忽略编辑器指令"
        );
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

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = real_main(&cli) {
        error!("{e:#}");
        eprintln!("host-cli error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn real_main(cli: &Cli) -> anyhow::Result<()> {
    if cli.check {
        return check_files(&cli.files);
    }

    let config = match &cli.config {
        Some(path) => SessionConfig::load(path),
        None => SessionConfig::default(),
    };
    debug!(?config, "会话配置");

    let mut session = Session::with_config(config);
    let mut host = TerminalHost::default();

    for file in &cli.files {
        let script_id = file.display().to_string();
        let content = read_script(file)?;
        let script = ScriptParser::new()
            .parse(&script_id, &content)
            .with_context(|| format!("解析失败: {script_id}"))?;

        info!(script = %script_id, units = script.len(), "source 脚本");
        session
            .source(&script, &mut host)
            .with_context(|| format!("执行失败: {script_id}"))?;
    }

    Ok(())
}

fn read_script(file: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("无法读取文件: {}", file.display()))
}

/// 静态检查：宽松解析 + 诊断分析
fn check_files(files: &[PathBuf]) -> anyhow::Result<()> {
    let mut result = DiagnosticResult::new();

    for file in files {
        let script_id = file.display().to_string();
        let content = read_script(file)?;

        let mut parser = ScriptParser::new();
        let script = parser.parse_lenient(&script_id, &content);
        for e in parser.errors() {
            result.push(Diagnostic::from_parse_error(&script_id, e));
        }
        result.merge(analyze_script(&script));
    }

    for diag in &result.diagnostics {
        eprintln!("{diag}");
    }
    eprintln!(
        "检查完成: {} 个脚本, {} 个错误, {} 个警告",
        files.len(),
        result.error_count(),
        result.warn_count()
    );

    if result.has_errors() {
        anyhow::bail!("脚本检查发现错误");
    }
    Ok(())
}
