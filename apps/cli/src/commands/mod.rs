//! 命令定义和实现

pub mod config;
pub mod run;

pub use config::ConfigCommand;
pub use run::SequenceArgs;

use bench_client::JogKey;
use bench_protocol::Axis;
use clap::Args;

/// 点动命令参数
#[derive(Args, Debug)]
pub struct JogCommand {
    /// 按键：w/s 垂直，a/d 水平，e/q 转接头
    pub key: JogKey,

    /// 按住时长（毫秒）
    #[arg(long, default_value_t = 500)]
    pub hold_ms: u64,

    /// 串口（覆盖配置）
    #[arg(short, long)]
    pub port: Option<String>,
}

/// 速度滑块命令参数
#[derive(Args, Debug)]
pub struct SpeedCommand {
    /// 轴：vertical, horizontal, adaptor
    pub axis: Axis,

    /// 滑块值（线性轴 0-100，转接头 0-50）
    pub value: f64,

    /// 串口（覆盖配置）
    #[arg(short, long)]
    pub port: Option<String>,
}
