//! 测试台会话
//!
//! One-shot 模式和 Shell 共用：一个可替换的连接，以及挂在它上面的点动、速度和序列控制。

use crate::commands::config::CliConfig;
use crate::commands::run::save_program;
use crate::display::{ConsoleCounter, ConsoleJog, ConsoleSpeed};
use anyhow::{Context, Result};
use bench_client::{
    JogController, JogKey, SequenceOutcome, SequenceParams, SequenceSupervisor, SequencerConfig,
    SharedLink, SpeedControl, TestProgram,
};
use bench_driver::{Link, LinkBuilder, LinkStatus};
use bench_protocol::Axis;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct BenchSession {
    config: CliConfig,
    link: Arc<SharedLink>,
    jog: JogController,
    speeds: SpeedControl,
    supervisor: Arc<SequenceSupervisor>,
    counter: Arc<ConsoleCounter>,
}

impl BenchSession {
    pub fn new(config: CliConfig) -> Self {
        Self::with_sequencer_config(config, SequencerConfig::default())
    }

    pub fn with_sequencer_config(config: CliConfig, sequencer: SequencerConfig) -> Self {
        let link = Arc::new(SharedLink::new());
        let counter = Arc::new(ConsoleCounter::new());
        Self {
            config,
            jog: JogController::new(link.clone()).with_indicator(Arc::new(ConsoleJog)),
            speeds: SpeedControl::new(link.clone()).with_display(Arc::new(ConsoleSpeed)),
            supervisor: Arc::new(SequenceSupervisor::new(link.clone(), counter.clone(), sequencer)),
            link,
            counter,
        }
    }

    /// 连接串口；`port` 为空时使用配置中的默认串口，再退回第一个可用串口
    pub fn connect(&self, port: Option<&str>) -> Result<()> {
        let mut builder = LinkBuilder::new()
            .baud_rate(self.config.baud_rate())
            .pipeline_config(self.config.pipeline_config());
        if let Some(port) = port.or(self.config.port.as_deref()) {
            builder = builder.port(port);
        }

        self.attach(builder.build().context("Could not connect to the test bench")?);
        Ok(())
    }

    /// 替换当前连接
    pub fn attach(&self, link: Link) {
        info!("Connected to {}", link.port_name());
        self.link.attach(link);
    }

    pub fn disconnect(&self) -> bool {
        if self.supervisor.is_running() {
            self.supervisor.stop();
            self.supervisor.wait(Duration::from_secs(2));
        }
        self.link.disconnect()
    }

    pub fn supervisor(&self) -> &Arc<SequenceSupervisor> {
        &self.supervisor
    }

    /// 状态摘要
    pub fn status(&self) -> String {
        let status = self.link.status();
        let mut lines = vec![match self.link.port_name() {
            Some(port) if status == LinkStatus::Connected => format!("Link: {status} ({port})"),
            _ => format!("Link: {status}"),
        }];

        if status.is_connected() {
            let state = bench_client::BenchIo::device_state(self.link.as_ref());
            lines.push(format!(
                "Device: id={} motor={:?} position={} updates={}",
                state.id, state.motor_state, state.position, state.update_count
            ));
            if let Some(metrics) = self.link.metrics() {
                lines.push(format!("Metrics: {metrics}"));
                lines.push(format!("RX health: {:.1}%", metrics.rx_health_rate()));
            }
        }

        for axis in Axis::ALL {
            let speed = self.speeds.current(axis);
            lines.push(format!(
                "{axis} speed: slider {} ({})",
                speed.slider,
                speed.display_text(axis)
            ));
        }

        lines.push(format!(
            "Sequence: {}{}",
            if self.supervisor.is_running() { "running" } else { "idle" },
            if self.supervisor.is_paused() { " (paused)" } else { "" }
        ));
        match self.counter.last() {
            Some(bench_client::REPETITIONS_STOPPED) => lines.push("Repetitions: stopped".to_string()),
            Some(value) => lines.push(format!("Repetitions: {value}")),
            None => {},
        }
        lines.join("\n")
    }

    /// 清零链路计数器
    pub fn reset_metrics(&self) -> bool {
        self.link.reset_metrics()
    }

    /// 按下并保持 `hold` 后松开
    pub fn jog(&self, key: JogKey, hold: Duration) {
        self.jog.key_down(key);
        std::thread::sleep(hold);
        self.jog.key_up();
    }

    pub fn set_speed(&self, axis: Axis, value: f64) -> Result<()> {
        if self.speeds.set_slider(axis, value)?.is_none() {
            println!("{axis} speed unchanged");
        }
        Ok(())
    }

    /// 以当前速度滑块保存程序文件
    pub fn save_program(&self, path: &Path, name: &str, params: SequenceParams) -> Result<TestProgram> {
        params.validate(&self.supervisor.sequencer().config().limits)?;
        let program = TestProgram::capture(name, &params, &self.speeds);
        save_program(path, &program)?;
        Ok(program)
    }

    pub fn apply_program_speeds(&self, program: &TestProgram) -> Result<()> {
        program.apply_speeds(&self.speeds)?;
        Ok(())
    }

    pub fn start_program(&self, params: SequenceParams) -> Result<()> {
        self.supervisor.start(params)?;
        Ok(())
    }

    pub fn start_test(&self, params: SequenceParams) -> Result<()> {
        self.supervisor.start_test(params)?;
        Ok(())
    }

    /// 阻塞等待序列结束
    pub fn wait_outcome(&self) -> Option<SequenceOutcome> {
        loop {
            if let Some(outcome) = self.supervisor.wait(Duration::from_millis(500)) {
                return Some(outcome);
            }
            if !self.supervisor.is_running() {
                return self.supervisor.try_outcome();
            }
        }
    }
}

impl Drop for BenchSession {
    fn drop(&mut self) {
        self.supervisor.stop();
    }
}
