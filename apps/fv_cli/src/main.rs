// apps/fv_cli/src/main.rs

//! 有限体积工具箱命令行界面
//!
//! - `run`: 在长方体网格上运行标量输运算例
//! - `info`: 列出已注册的边界条件、耦合方法、重编号方法与模型族
//! - `validate`: 检查求解控制、字典文件或场文件

mod case;
mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// 有限体积场与离散工具箱
#[derive(Parser)]
#[command(name = "fv_cli")]
#[command(author = "FvToolbox Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Finite-volume field and discretisation toolbox", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行标量输运算例
    Run(commands::run::RunArgs),
    /// 显示已注册类型
    Info(commands::info::InfoArgs),
    /// 验证输入文件
    Validate(commands::validate::ValidateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Info(args) => commands::info::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
    }
}
