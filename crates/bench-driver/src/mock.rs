//! 模拟串口适配器（测试用）
//!
//! 两种用法：
//!
//! - 脚本模式：测试通过 [`MockHandle`] 推入原始字节或状态帧，读线程按顺序读出
//! - 桩设备模式：收到位置控制命令后先上报 `InTrajectory`，保持 `trajectory_hold`
//!   后上报 `EndOfTrajectory`，直到下一条命令

use crate::transport::{LinkError, RxAdapter, SerialAdapter, SplittableAdapter, TxAdapter};
use bench_protocol::{CommandFrame, FrameVariant, Mode, MotorState, StatusFrame};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

/// 桩设备配置
#[derive(Debug, Clone)]
pub struct StubDeviceConfig {
    /// 每条轨迹保持 `InTrajectory` 的时长
    pub trajectory_hold: Duration,
    /// 状态帧上报间隔
    pub report_interval: Duration,
    pub frame_variant: FrameVariant,
}

impl Default for StubDeviceConfig {
    fn default() -> Self {
        Self {
            trajectory_hold: Duration::from_millis(50),
            report_interval: Duration::from_millis(2),
            frame_variant: FrameVariant::Extended,
        }
    }
}

struct StubDevice {
    config: StubDeviceConfig,
    id: u8,
    motor_state: MotorState,
    position: i32,
    target: i32,
    trajectory_started: Option<Instant>,
}

impl StubDevice {
    fn new(config: StubDeviceConfig) -> Self {
        Self {
            config,
            id: 0,
            motor_state: MotorState::Idle,
            position: 0,
            target: 0,
            trajectory_started: None,
        }
    }

    fn on_command(&mut self, frame: &CommandFrame) {
        self.id = u8::from(frame.id);
        match frame.mode {
            Mode::PositionControl => {
                self.target = i32::from(frame.data);
                self.motor_state = MotorState::InTrajectory;
                self.trajectory_started = Some(Instant::now());
            },
            Mode::Manual if frame.command.is_stop() => self.motor_state = MotorState::Idle,
            Mode::Manual => self.motor_state = MotorState::Jogging,
            Mode::ChangeParameters => self.motor_state = MotorState::ChangingParameters,
            Mode::None | Mode::Reset => self.motor_state = MotorState::Idle,
        }
    }

    fn report(&mut self) -> StatusFrame {
        if let Some(started) = self.trajectory_started
            && started.elapsed() >= self.config.trajectory_hold
        {
            self.motor_state = MotorState::EndOfTrajectory;
            self.position = self.target;
            self.trajectory_started = None;
        }

        let frame = StatusFrame {
            id: self.id,
            movement_status: u8::from(self.trajectory_started.is_some()),
            motor_state: self.motor_state,
            position: Some(self.position),
        };

        if self.motor_state == MotorState::ChangingParameters {
            self.motor_state = MotorState::Idle;
        }
        frame
    }
}

struct MockShared {
    rx_queue: Mutex<VecDeque<Vec<u8>>>,
    sent: Mutex<Vec<Vec<u8>>>,
    stub: Mutex<Option<StubDevice>>,
    unplugged: AtomicBool,
    frame_variant: FrameVariant,
}

impl MockShared {
    fn receive(&self, buf: &mut [u8]) -> Result<usize, LinkError> {
        if self.unplugged.load(Ordering::Acquire) {
            return Err(LinkError::Device("mock device unplugged".to_string()));
        }

        if let Some(bytes) = self.rx_queue.lock().pop_front() {
            let n = bytes.len().min(buf.len());
            buf[..n].copy_from_slice(&bytes[..n]);
            return Ok(n);
        }

        let interval = self.stub.lock().as_ref().map(|stub| stub.config.report_interval);
        let Some(interval) = interval else {
            // 模拟读超时
            std::thread::sleep(Duration::from_millis(1));
            return Err(LinkError::Timeout);
        };

        std::thread::sleep(interval);
        let mut guard = self.stub.lock();
        let Some(stub) = guard.as_mut() else {
            return Err(LinkError::Timeout);
        };
        let bytes = stub.report().to_bytes(stub.config.frame_variant);
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }

    fn send(&self, bytes: &[u8]) -> Result<(), LinkError> {
        if self.unplugged.load(Ordering::Acquire) {
            return Err(LinkError::Device("mock device unplugged".to_string()));
        }

        self.sent.lock().push(bytes.to_vec());
        if let Ok(frame) = CommandFrame::from_bytes(bytes) {
            trace!("mock device received {:?}", frame);
            if let Some(stub) = self.stub.lock().as_mut() {
                stub.on_command(&frame);
            }
        }
        Ok(())
    }
}

/// 模拟串口适配器
pub struct MockSerialAdapter {
    shared: Arc<MockShared>,
    name: String,
}

impl MockSerialAdapter {
    /// 脚本模式（扩展状态帧）
    pub fn new(name: &str) -> (Self, MockHandle) {
        Self::build(name, FrameVariant::Extended, None)
    }

    /// 脚本模式，指定状态帧变体
    pub fn with_variant(name: &str, frame_variant: FrameVariant) -> (Self, MockHandle) {
        Self::build(name, frame_variant, None)
    }

    /// 桩设备模式
    pub fn with_stub(name: &str, config: StubDeviceConfig) -> (Self, MockHandle) {
        let variant = config.frame_variant;
        Self::build(name, variant, Some(StubDevice::new(config)))
    }

    fn build(name: &str, frame_variant: FrameVariant, stub: Option<StubDevice>) -> (Self, MockHandle) {
        let shared = Arc::new(MockShared {
            rx_queue: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            stub: Mutex::new(stub),
            unplugged: AtomicBool::new(false),
            frame_variant,
        });
        (
            Self {
                shared: shared.clone(),
                name: name.to_string(),
            },
            MockHandle { shared },
        )
    }
}

impl SerialAdapter for MockSerialAdapter {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.shared.send(bytes)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        self.shared.receive(buf)
    }

    fn port_name(&self) -> &str {
        &self.name
    }
}

impl SplittableAdapter for MockSerialAdapter {
    type RxAdapter = MockRxAdapter;
    type TxAdapter = MockTxAdapter;

    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), LinkError> {
        Ok((
            MockRxAdapter {
                shared: self.shared.clone(),
            },
            MockTxAdapter {
                shared: self.shared,
            },
        ))
    }
}

pub struct MockRxAdapter {
    shared: Arc<MockShared>,
}

impl RxAdapter for MockRxAdapter {
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        self.shared.receive(buf)
    }
}

pub struct MockTxAdapter {
    shared: Arc<MockShared>,
}

impl TxAdapter for MockTxAdapter {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.shared.send(bytes)
    }
}

/// 测试侧句柄：注入接收数据、检查已发送帧
#[derive(Clone)]
pub struct MockHandle {
    shared: Arc<MockShared>,
}

impl MockHandle {
    /// 推入原始字节（可以是不完整的帧）
    pub fn push_raw(&self, bytes: Vec<u8>) {
        self.shared.rx_queue.lock().push_back(bytes);
    }

    /// 按适配器的帧变体推入状态帧
    pub fn push_status(&self, frame: StatusFrame) {
        self.push_raw(frame.to_bytes(self.shared.frame_variant));
    }

    /// 已发送的原始字节
    pub fn sent_raw(&self) -> Vec<Vec<u8>> {
        self.shared.sent.lock().clone()
    }

    /// 已发送的命令帧（跳过无法解析的数据）
    pub fn sent_frames(&self) -> Vec<CommandFrame> {
        self.shared
            .sent
            .lock()
            .iter()
            .filter_map(|bytes| CommandFrame::from_bytes(bytes).ok())
            .collect()
    }

    pub fn clear_sent(&self) {
        self.shared.sent.lock().clear();
    }

    /// 模拟设备拔出：之后的读写都返回设备错误
    pub fn unplug(&self) {
        self.shared.unplugged.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_protocol::{Command, ComponentId};

    #[test]
    fn test_scripted_receive() {
        let (mut adapter, handle) = MockSerialAdapter::new("mock");
        handle.push_raw(vec![1, 2, 3, 4, 5, 6, 7, 8]);

        let mut buf = [0u8; 8];
        assert_eq!(adapter.receive(&mut buf).unwrap(), 8);
        assert!(matches!(adapter.receive(&mut buf), Err(LinkError::Timeout)));
    }

    #[test]
    fn test_stub_trajectory_cycle() {
        let config = StubDeviceConfig {
            trajectory_hold: Duration::from_millis(20),
            report_interval: Duration::from_millis(1),
            frame_variant: FrameVariant::Extended,
        };
        let (mut adapter, _handle) = MockSerialAdapter::with_stub("stub", config);
        let mut buf = [0u8; 8];

        adapter.receive(&mut buf).unwrap();
        assert_eq!(StatusFrame::parse(&buf).unwrap().motor_state, MotorState::Idle);

        let frame = CommandFrame::position(ComponentId::MotorVerticalLeft, Command::VerticalUp, 80);
        adapter.send(&frame.to_bytes()).unwrap();
        adapter.receive(&mut buf).unwrap();
        assert_eq!(StatusFrame::parse(&buf).unwrap().motor_state, MotorState::InTrajectory);

        std::thread::sleep(Duration::from_millis(30));
        adapter.receive(&mut buf).unwrap();
        let status = StatusFrame::parse(&buf).unwrap();
        assert_eq!(status.motor_state, MotorState::EndOfTrajectory);
        assert_eq!(status.position, Some(80));
        assert_eq!(status.id, 4);
    }

    #[test]
    fn test_stub_jog_and_stop() {
        let (mut adapter, handle) = MockSerialAdapter::with_stub("stub", StubDeviceConfig::default());
        let mut buf = [0u8; 8];

        let jog = CommandFrame::manual(ComponentId::MotorHorizontal, Command::HorizontalLeft);
        adapter.send(&jog.to_bytes()).unwrap();
        adapter.receive(&mut buf).unwrap();
        assert_eq!(StatusFrame::parse(&buf).unwrap().motor_state, MotorState::Jogging);

        let stop = CommandFrame::manual(ComponentId::MotorHorizontal, Command::HorizontalStop);
        adapter.send(&stop.to_bytes()).unwrap();
        adapter.receive(&mut buf).unwrap();
        assert_eq!(StatusFrame::parse(&buf).unwrap().motor_state, MotorState::Idle);

        assert_eq!(handle.sent_frames(), vec![jog, stop]);
    }

    #[test]
    fn test_unplug() {
        let (mut adapter, handle) = MockSerialAdapter::new("mock");
        handle.unplug();
        let mut buf = [0u8; 4];
        assert!(adapter.receive(&mut buf).unwrap_err().is_fatal());
        assert!(adapter.send(&[0, 0, 0, 0]).is_err());
    }
}
