//! run / test 命令
//!
//! 序列参数来自命令行参数或 TOML 程序文件（`TestProgram` 的 serde 表示）。

use anyhow::{Context, Result};
use bench_client::{Movement, SequenceParams, TestProgram};
use clap::Args;
use std::fs;
use std::path::Path;

/// 解析运动方向，允许用 `-` 代替空格（`up-to-down`）
pub fn parse_movement(s: &str) -> Result<Movement, bench_client::ClientError> {
    s.replace('-', " ").parse()
}

/// 序列参数
#[derive(Args, Debug, Clone)]
pub struct SequenceArgs {
    /// TOML 程序文件（提供时忽略其余参数）
    #[arg(long, conflicts_with_all = ["movement", "amplitude", "turns", "repetitions"])]
    pub program: Option<String>,

    /// 运动方向，例如 "Up to down" 或 up-to-down
    #[arg(short, long, value_parser = parse_movement)]
    pub movement: Option<Movement>,

    /// 线性轴行程（mm）
    #[arg(short, long, default_value_t = 0)]
    pub amplitude: u16,

    /// 转接头圈数
    #[arg(short, long, default_value_t = 0.0)]
    pub turns: f64,

    /// 目标重复次数
    #[arg(short, long, default_value_t = 1)]
    pub repetitions: u32,

    /// 串口（覆盖配置）
    #[arg(short, long)]
    pub port: Option<String>,
}

/// 解析后的序列请求
#[derive(Debug, Clone)]
pub struct SequenceRequest {
    pub params: SequenceParams,
    /// 程序文件中的速度，需要先下发
    pub program: Option<TestProgram>,
}

impl SequenceArgs {
    pub fn resolve(&self) -> Result<SequenceRequest> {
        if let Some(path) = &self.program {
            let program = load_program(Path::new(path))?;
            return Ok(SequenceRequest {
                params: program.to_params(),
                program: Some(program),
            });
        }

        let movement = self.movement.ok_or(bench_client::ClientError::MissingMovement)?;
        Ok(SequenceRequest {
            params: SequenceParams {
                movement,
                amplitude_mm: self.amplitude,
                turns: self.turns,
                repetitions: self.repetitions,
            },
            program: None,
        })
    }
}

/// 从 TOML 文件加载测试程序
pub fn load_program(path: &Path) -> Result<TestProgram> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read program {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid program file {}", path.display()))
}

/// 把测试程序保存为 TOML
pub fn save_program(path: &Path, program: &TestProgram) -> Result<()> {
    let content = toml::to_string_pretty(program).context("Failed to serialize program")?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
