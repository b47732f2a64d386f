//! # Bench CLI
//!
//! Command-line interface for the motorized test bench.
//!
//! ## 双模式架构
//!
//! ### One-shot 模式（用于脚本）
//!
//! ```bash
//! # 配置默认串口
//! bench-cli config set --port /dev/ttyUSB0
//!
//! # 执行操作（内部：连接 -> 运行 -> 断开）
//! bench-cli run --movement up-to-down --amplitude 50 --repetitions 3
//! bench-cli jog w --hold-ms 300
//! ```
//!
//! ### REPL 模式（用于调试）
//!
//! ```bash
//! $ bench-cli shell
//! bench> connect
//! bench> speed vertical 40
//! bench> run up-to-down 50 0 3
//! bench> pause
//! bench> resume
//! bench> exit
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod display;
mod modes;
mod session;

use commands::{ConfigCommand, JogCommand, SequenceArgs, SpeedCommand};
use modes::{oneshot, repl};

/// Bench CLI - 测试台命令行工具
#[derive(Parser, Debug)]
#[command(name = "bench-cli")]
#[command(about = "Command-line interface for the motorized test bench", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 列出串口
    Ports,

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 运行完整程序（Ctrl+C 停止）
    Run {
        #[command(flatten)]
        args: SequenceArgs,
    },

    /// 单次测试往返
    Test {
        #[command(flatten)]
        args: SequenceArgs,
    },

    /// 点动一个轴
    Jog {
        #[command(flatten)]
        args: JogCommand,
    },

    /// 设置速度滑块
    Speed {
        #[command(flatten)]
        args: SpeedCommand,
    },

    /// 启动交互式 Shell（REPL 模式）
    Shell,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bench_cli=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ports => oneshot::ports(),
        Commands::Config(cmd) => cmd.execute(),
        Commands::Run { args } => oneshot::sequence(args, false),
        Commands::Test { args } => oneshot::sequence(args, true),
        Commands::Jog { args } => oneshot::jog(args),
        Commands::Speed { args } => oneshot::speed(args),
        Commands::Shell => repl::run_repl(),
    }
}
