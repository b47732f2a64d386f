//! One-shot 模式
//!
//! 每个命令独立执行：读取配置，连接，执行，断开。

use crate::commands::config::CliConfig;
use crate::commands::{JogCommand, SequenceArgs, SpeedCommand};
use crate::session::BenchSession;
use anyhow::Result;
use bench_client::SequenceOutcome;
use bench_driver::list_ports;
use std::time::Duration;
use tracing::warn;

/// 列出串口
pub fn ports() -> Result<()> {
    let ports = list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{:<20} {}", port.name, port.description);
    }
    Ok(())
}

/// 执行完整程序（`test = false`）或单次测试往返
pub fn sequence(args: SequenceArgs, test: bool) -> Result<()> {
    let request = args.resolve()?;
    let session = BenchSession::new(CliConfig::load()?);
    session.connect(args.port.as_deref())?;

    if let Some(program) = &request.program {
        println!("Program: {}", program.name);
        session.apply_program_speeds(program)?;
    }

    // Ctrl+C：协作式停止
    let supervisor = session.supervisor().clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nStopping sequence...");
        supervisor.stop();
    }) {
        warn!("Could not install Ctrl+C handler: {}", e);
    }

    if test {
        println!("Testing {}", request.params.movement);
        session.start_test(request.params)?;
    } else {
        println!(
            "Running {} x{}",
            request.params.movement, request.params.repetitions
        );
        session.start_program(request.params)?;
    }

    match session.wait_outcome() {
        Some(SequenceOutcome::Completed { repetitions }) => {
            println!("Completed ({repetitions} repetitions)");
        },
        Some(SequenceOutcome::Stopped { repetitions }) => {
            println!("Stopped after {repetitions} repetitions");
        },
        Some(SequenceOutcome::Rejected { reason }) => anyhow::bail!(reason),
        None => anyhow::bail!("Sequence ended without reporting an outcome"),
    }

    session.disconnect();
    Ok(())
}

/// 点动一次
pub fn jog(cmd: JogCommand) -> Result<()> {
    let session = BenchSession::new(CliConfig::load()?);
    session.connect(cmd.port.as_deref())?;
    session.jog(cmd.key, Duration::from_millis(cmd.hold_ms));
    session.disconnect();
    Ok(())
}

/// 设置速度滑块
pub fn speed(cmd: SpeedCommand) -> Result<()> {
    let session = BenchSession::new(CliConfig::load()?);
    session.connect(cmd.port.as_deref())?;
    session.set_speed(cmd.axis, cmd.value)?;
    session.disconnect();
    Ok(())
}
