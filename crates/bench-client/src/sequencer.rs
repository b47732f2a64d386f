//! 自动往返序列
//!
//! 在检查点 A、B 之间交替发送位置控制命令，每次回到 A 计一次重复。
//!
//! # 状态机
//!
//! ```text
//! Init ──(检查点 = A, 上一个 = B 时发送 A)──▶ WaitingForAck
//! WaitingForAck ──(电机 InTrajectory)──▶ WaitingEndOfTrajectory
//! WaitingEndOfTrajectory ──(电机 EndOfTrajectory)──▶ ReadyToSendNext
//! ReadyToSendNext ──(发送反向命令，翻转检查点)──▶ WaitingForAck
//! 任意状态 ──(停止)──▶ Stopped
//! ```
//!
//! 轮询是协作式的：停止和暂停标志每次循环检查一次，停止在一个轮询周期内生效。
//! 设备一直不上报 `EndOfTrajectory` 时序列会一直等待，直到被停止；这里不设超时。

use crate::error::ClientError;
use crate::io::BenchIo;
use crate::movement::{Movement, Trajectory, TravelLimits};
use bench_protocol::{Command, CommandFrame, MotorState};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// 中途停止时重复次数显示的哨兵值
pub const REPETITIONS_STOPPED: i32 = -99;

/// 重复次数上限，超过后显示值无法表示
pub const MAX_REPETITIONS: u32 = i32::MAX as u32;

/// 检查点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    A,
    B,
}

impl Checkpoint {
    pub fn opposite(self) -> Self {
        match self {
            Checkpoint::A => Checkpoint::B,
            Checkpoint::B => Checkpoint::A,
        }
    }
}

/// 当前驶向的检查点和上一个检查点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointState {
    pub target: Checkpoint,
    pub previous: Checkpoint,
}

impl CheckpointState {
    /// 初始位置：驶向 A，来自 B
    pub const INITIAL: CheckpointState = CheckpointState {
        target: Checkpoint::A,
        previous: Checkpoint::B,
    };

    pub fn is_initial(&self) -> bool {
        *self == Self::INITIAL
    }

    /// 发出命令后翻转
    fn advance(&mut self) {
        self.previous = self.target;
        self.target = self.target.opposite();
    }
}

impl Default for CheckpointState {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// 序列状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencePhase {
    #[default]
    Init,
    WaitingForAck,
    WaitingEndOfTrajectory,
    ReadyToSendNext,
    Stopped,
}

/// 序列参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceParams {
    pub movement: Movement,
    /// 线性轴行程（mm）
    pub amplitude_mm: u16,
    /// 转接头圈数
    pub turns: f64,
    /// 目标重复次数（完整程序）
    pub repetitions: u32,
}

impl SequenceParams {
    /// 校验重复次数和行程上限
    pub fn validate(&self, limits: &TravelLimits) -> Result<(), ClientError> {
        if self.repetitions == 0 || self.repetitions > MAX_REPETITIONS {
            return Err(ClientError::InvalidRepetitions(self.repetitions));
        }
        limits.validate(self.movement, self.amplitude_mm, self.turns)
    }

    pub fn target_data(&self) -> Result<u16, ClientError> {
        self.movement.target_data(self.amplitude_mm, self.turns)
    }
}

/// 协作式停止/暂停标志
///
/// 只有控制方（Supervisor）写入，序列线程只读。
#[derive(Debug, Default)]
pub struct SequenceFlags {
    stop: AtomicBool,
    pause: AtomicBool,
}

impl SequenceFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn pause(&self) {
        self.pause.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.pause.store(false, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::Acquire)
    }

    /// 启动新序列前清除两个标志
    pub fn clear(&self) {
        self.stop.store(false, Ordering::Release);
        self.pause.store(false, Ordering::Release);
    }
}

/// 重复次数显示接口
pub trait RepetitionDisplay: Send + Sync {
    fn show_repetitions(&self, value: i32);
}

/// 保存最近一次显示值的计数器
#[derive(Debug, Default)]
pub struct RepetitionCounter {
    value: AtomicI32,
}

impl RepetitionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> i32 {
        self.value.load(Ordering::Acquire)
    }
}

impl RepetitionDisplay for RepetitionCounter {
    fn show_repetitions(&self, value: i32) {
        self.value.store(value, Ordering::Release);
    }
}

/// 序列配置
#[derive(Debug, Clone, PartialEq)]
pub struct SequencerConfig {
    /// 设备状态轮询间隔
    pub poll_interval: Duration,
    pub limits: TravelLimits,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            limits: TravelLimits::default(),
        }
    }
}

/// 序列结束原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceOutcome {
    /// 完成目标重复次数（测试模式完成一次往返）
    Completed { repetitions: u32 },
    /// 被停止
    Stopped { repetitions: u32 },
    /// 参数无效，未发送任何帧
    Rejected { reason: String },
}

/// 自动序列
///
/// 检查点状态在多次运行之间保留，停止时复位到 `(A, 上一个 B)`。
pub struct Sequencer {
    io: Arc<dyn BenchIo>,
    flags: Arc<SequenceFlags>,
    checkpoint: Mutex<CheckpointState>,
    phase: Mutex<SequencePhase>,
    display: Arc<dyn RepetitionDisplay>,
    config: SequencerConfig,
}

impl Sequencer {
    pub fn new(
        io: Arc<dyn BenchIo>,
        flags: Arc<SequenceFlags>,
        display: Arc<dyn RepetitionDisplay>,
        config: SequencerConfig,
    ) -> Self {
        Self {
            io,
            flags,
            checkpoint: Mutex::new(CheckpointState::INITIAL),
            phase: Mutex::new(SequencePhase::Init),
            display,
            config,
        }
    }

    pub fn checkpoint(&self) -> CheckpointState {
        *self.checkpoint.lock()
    }

    pub fn reset_checkpoint(&self) {
        *self.checkpoint.lock() = CheckpointState::INITIAL;
    }

    pub fn phase(&self) -> SequencePhase {
        *self.phase.lock()
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    fn set_phase(&self, phase: SequencePhase) {
        let mut current = self.phase.lock();
        if *current != phase {
            debug!("sequence phase {:?} -> {:?}", *current, phase);
            *current = phase;
        }
    }

    fn send_position(&self, trajectory: &Trajectory, command: Command, data: u16) {
        debug!("sending {:?} to {:?} (data={})", command, trajectory.id, data);
        self.io
            .send(&CommandFrame::position(trajectory.id, command, data));
    }

    fn motor_state(&self) -> MotorState {
        self.io.device_state().motor_state
    }

    /// 按检查点发送下一条命令并翻转，回到 A 时返回 true
    fn send_next(&self, trajectory: &Trajectory, data: u16) -> bool {
        let mut checkpoint = self.checkpoint.lock();
        let command = match checkpoint.target {
            Checkpoint::A => trajectory.command_a,
            Checkpoint::B => trajectory.command_b,
        };
        self.send_position(trajectory, command, data);
        let returned_to_a = checkpoint.target == Checkpoint::B;
        checkpoint.advance();
        returned_to_a
    }

    /// 完整程序：往返直到达到目标重复次数或被停止
    pub fn run_program(&self, params: &SequenceParams) -> SequenceOutcome {
        if let Err(e) = params.validate(&self.config.limits) {
            return SequenceOutcome::Rejected {
                reason: e.to_string(),
            };
        }
        let data = match params.target_data() {
            Ok(data) => data,
            Err(e) => {
                return SequenceOutcome::Rejected {
                    reason: e.to_string(),
                };
            },
        };
        let trajectory = params.movement.resolve();
        let mut repetitions = 0u32;

        info!(
            "Starting program: {} x{} (data={})",
            params.movement, params.repetitions, data
        );
        self.set_phase(SequencePhase::Init);

        if self.checkpoint().is_initial() {
            self.send_next(&trajectory, data);
        }
        self.set_phase(SequencePhase::WaitingForAck);

        while !self.flags.is_stop_requested() && repetitions < params.repetitions {
            if !self.flags.is_paused() {
                match self.phase() {
                    SequencePhase::WaitingForAck => {
                        if self.motor_state() == MotorState::InTrajectory {
                            self.set_phase(SequencePhase::WaitingEndOfTrajectory);
                        }
                    },
                    SequencePhase::WaitingEndOfTrajectory => {
                        if self.motor_state() == MotorState::EndOfTrajectory {
                            self.set_phase(SequencePhase::ReadyToSendNext);
                        }
                    },
                    SequencePhase::ReadyToSendNext => {
                        if self.send_next(&trajectory, data) {
                            repetitions += 1;
                            debug!("repetition {} / {}", repetitions, params.repetitions);
                        }
                        self.set_phase(SequencePhase::WaitingForAck);
                    },
                    SequencePhase::Init | SequencePhase::Stopped => {},
                }
                self.display
                    .show_repetitions(i32::try_from(repetitions).unwrap_or(i32::MAX));
            }

            spin_sleep::sleep(self.config.poll_interval);
        }

        self.set_phase(SequencePhase::Stopped);
        if self.flags.is_stop_requested() {
            self.reset_checkpoint();
            if repetitions < params.repetitions {
                self.display.show_repetitions(REPETITIONS_STOPPED);
            }
            info!("Program stopped after {} repetitions", repetitions);
            SequenceOutcome::Stopped { repetitions }
        } else {
            info!("Program completed: {} repetitions", repetitions);
            SequenceOutcome::Completed { repetitions }
        }
    }

    /// 测试模式：发送 A，等待一次轨迹结束，发送 B 后结束
    ///
    /// 不使用也不修改共享检查点。
    pub fn run_test(&self, params: &SequenceParams) -> SequenceOutcome {
        if let Err(e) = self.config.limits.validate(params.movement, params.amplitude_mm, params.turns) {
            return SequenceOutcome::Rejected {
                reason: e.to_string(),
            };
        }
        let data = match params.target_data() {
            Ok(data) => data,
            Err(e) => {
                return SequenceOutcome::Rejected {
                    reason: e.to_string(),
                };
            },
        };
        let trajectory = params.movement.resolve();

        info!("Testing movement: {} (data={})", params.movement, data);
        self.set_phase(SequencePhase::Init);
        self.send_position(&trajectory, trajectory.command_a, data);
        self.set_phase(SequencePhase::WaitingForAck);

        let mut target = Checkpoint::B;
        let mut completed = false;

        while !self.flags.is_stop_requested() && !completed {
            if !self.flags.is_paused() {
                let motor_state = self.motor_state();
                match self.phase() {
                    SequencePhase::WaitingForAck => {
                        if motor_state == MotorState::InTrajectory {
                            self.set_phase(SequencePhase::WaitingEndOfTrajectory);
                        }
                    },
                    SequencePhase::WaitingEndOfTrajectory => {
                        if motor_state == MotorState::EndOfTrajectory {
                            self.set_phase(SequencePhase::ReadyToSendNext);
                        }
                    },
                    SequencePhase::ReadyToSendNext => {
                        if motor_state == MotorState::EndOfTrajectory && target == Checkpoint::B {
                            self.send_position(&trajectory, trajectory.command_b, data);
                            target = Checkpoint::A;
                            completed = true;
                        }
                    },
                    SequencePhase::Init | SequencePhase::Stopped => {},
                }
            }

            if !completed {
                spin_sleep::sleep(self.config.poll_interval);
            }
        }

        self.set_phase(SequencePhase::Stopped);
        if completed {
            info!("Test movement completed");
            SequenceOutcome::Completed { repetitions: 1 }
        } else {
            info!("Test movement stopped");
            SequenceOutcome::Stopped { repetitions: 0 }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_driver::DeviceState;
    use bench_protocol::{ComponentId, Mode};
    use std::sync::atomic::AtomicU64;

    /// 每次读取状态在 InTrajectory 与 EndOfTrajectory 之间交替的桩设备
    #[derive(Default)]
    struct AlternatingIo {
        polls: AtomicU64,
        sent: Mutex<Vec<CommandFrame>>,
    }

    impl BenchIo for AlternatingIo {
        fn send(&self, frame: &CommandFrame) {
            self.sent.lock().push(*frame);
        }

        fn device_state(&self) -> DeviceState {
            let n = self.polls.fetch_add(1, Ordering::Relaxed);
            DeviceState {
                motor_state: if n % 2 == 0 {
                    MotorState::InTrajectory
                } else {
                    MotorState::EndOfTrajectory
                },
                ..Default::default()
            }
        }
    }

    /// 状态固定的桩设备
    struct FixedIo {
        state: MotorState,
        sent: Mutex<Vec<CommandFrame>>,
    }

    impl BenchIo for FixedIo {
        fn send(&self, frame: &CommandFrame) {
            self.sent.lock().push(*frame);
        }

        fn device_state(&self) -> DeviceState {
            DeviceState {
                motor_state: self.state,
                ..Default::default()
            }
        }
    }

    fn fast_config() -> SequencerConfig {
        SequencerConfig {
            poll_interval: Duration::from_millis(1),
            ..Default::default()
        }
    }

    fn params(movement: Movement, repetitions: u32) -> SequenceParams {
        SequenceParams {
            movement,
            amplitude_mm: 50,
            turns: 2.5,
            repetitions,
        }
    }

    fn sequencer(io: Arc<dyn BenchIo>) -> (Sequencer, Arc<SequenceFlags>, Arc<RepetitionCounter>) {
        let flags = Arc::new(SequenceFlags::new());
        let counter = Arc::new(RepetitionCounter::new());
        (
            Sequencer::new(io, flags.clone(), counter.clone(), fast_config()),
            flags,
            counter,
        )
    }

    #[test]
    fn test_program_sends_alternating_commands() {
        let io = Arc::new(AlternatingIo::default());
        let (seq, _flags, counter) = sequencer(io.clone());

        let outcome = seq.run_program(&params(Movement::UpToDown, 3));
        assert_eq!(outcome, SequenceOutcome::Completed { repetitions: 3 });
        assert_eq!(counter.get(), 3);

        let commands: Vec<Command> = io.sent.lock().iter().map(|f| f.command).collect();
        assert_eq!(
            commands,
            vec![
                Command::VerticalUp,
                Command::VerticalDown,
                Command::VerticalUp,
                Command::VerticalDown,
                Command::VerticalUp,
                Command::VerticalDown,
            ]
        );
        for frame in io.sent.lock().iter() {
            assert_eq!(frame.mode, Mode::PositionControl);
            assert_eq!(frame.id, ComponentId::MotorVerticalLeft);
            assert_eq!(frame.data, 50);
        }
        assert!(seq.checkpoint().is_initial());
        assert_eq!(seq.phase(), SequencePhase::Stopped);
    }

    #[test]
    fn test_two_cycles_return_to_initial_checkpoint() {
        let io = Arc::new(AlternatingIo::default());
        let (seq, _flags, counter) = sequencer(io.clone());

        seq.run_program(&params(Movement::LeftToRight, 1));
        // A 然后 B：回到初始检查点，计数 +1
        assert_eq!(io.sent.lock().len(), 2);
        assert_eq!(seq.checkpoint(), CheckpointState::INITIAL);
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn test_adaptor_payload_is_turns_times_100() {
        let io = Arc::new(AlternatingIo::default());
        let (seq, _flags, _counter) = sequencer(io.clone());

        seq.run_program(&params(Movement::ScrewUpToScrewDown, 1));
        let sent = io.sent.lock().clone();
        assert_eq!(sent[0].id, ComponentId::MotorAdaptor);
        assert_eq!(sent[0].command, Command::AdaptorUp);
        assert_eq!(sent[1].command, Command::AdaptorDown);
        assert!(sent.iter().all(|f| f.data == 250));
    }

    #[test]
    fn test_stop_mid_run_resets_checkpoint_and_shows_sentinel() {
        // 一直处于轨迹中：序列停在 WaitingEndOfTrajectory
        let io = Arc::new(FixedIo {
            state: MotorState::InTrajectory,
            sent: Mutex::new(Vec::new()),
        });
        let (seq, flags, counter) = sequencer(io.clone());
        let seq = Arc::new(seq);

        let worker = {
            let seq = seq.clone();
            std::thread::spawn(move || seq.run_program(&params(Movement::UpToDown, 5)))
        };

        for _ in 0..500 {
            if seq.phase() == SequencePhase::WaitingEndOfTrajectory {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(seq.checkpoint().target, Checkpoint::B);

        flags.request_stop();
        let outcome = worker.join().unwrap();
        assert_eq!(outcome, SequenceOutcome::Stopped { repetitions: 0 });
        assert_eq!(seq.checkpoint(), CheckpointState::INITIAL);
        assert_eq!(counter.get(), REPETITIONS_STOPPED);
        assert_eq!(io.sent.lock().len(), 1);
    }

    #[test]
    fn test_pause_blocks_progress() {
        let io = Arc::new(AlternatingIo::default());
        let (seq, flags, counter) = sequencer(io.clone());
        let seq = Arc::new(seq);

        flags.pause();
        flags.pause();
        let worker = {
            let seq = seq.clone();
            std::thread::spawn(move || seq.run_program(&params(Movement::DownToUp, 2)))
        };

        std::thread::sleep(Duration::from_millis(30));
        // 暂停期间只有进入循环前的第一条命令
        assert_eq!(io.sent.lock().len(), 1);
        assert_eq!(counter.get(), 0);
        assert_eq!(io.polls.load(Ordering::Relaxed), 0);

        flags.resume();
        let outcome = worker.join().unwrap();
        assert_eq!(outcome, SequenceOutcome::Completed { repetitions: 2 });
        assert_eq!(io.sent.lock().len(), 4);
    }

    #[test]
    fn test_stuck_before_ack_waits_until_stopped() {
        let io = Arc::new(FixedIo {
            state: MotorState::Idle,
            sent: Mutex::new(Vec::new()),
        });
        let (seq, flags, _counter) = sequencer(io.clone());
        let seq = Arc::new(seq);

        let worker = {
            let seq = seq.clone();
            std::thread::spawn(move || seq.run_program(&params(Movement::UpToDown, 1)))
        };
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(seq.phase(), SequencePhase::WaitingForAck);

        flags.request_stop();
        assert!(matches!(
            worker.join().unwrap(),
            SequenceOutcome::Stopped { repetitions: 0 }
        ));
    }

    #[test]
    fn test_invalid_params_send_nothing() {
        let io = Arc::new(AlternatingIo::default());
        let (seq, _flags, _counter) = sequencer(io.clone());

        let mut too_far = params(Movement::UpToDown, 1);
        too_far.amplitude_mm = 401;
        assert!(matches!(seq.run_program(&too_far), SequenceOutcome::Rejected { .. }));

        let zero_reps = params(Movement::UpToDown, 0);
        assert!(matches!(seq.run_program(&zero_reps), SequenceOutcome::Rejected { .. }));

        // 显示值为 i32，超过上限的目标会回绕成负数
        let too_many = params(Movement::UpToDown, MAX_REPETITIONS + 1);
        assert!(matches!(seq.run_program(&too_many), SequenceOutcome::Rejected { .. }));
        assert!(params(Movement::UpToDown, MAX_REPETITIONS)
            .validate(&TravelLimits::default())
            .is_ok());

        assert!(io.sent.lock().is_empty());
    }

    #[test]
    fn test_single_pass_leaves_checkpoint_untouched() {
        let io = Arc::new(AlternatingIo::default());
        let (seq, _flags, counter) = sequencer(io.clone());

        let outcome = seq.run_test(&params(Movement::RightToLeft, 0));
        assert_eq!(outcome, SequenceOutcome::Completed { repetitions: 1 });

        let commands: Vec<Command> = io.sent.lock().iter().map(|f| f.command).collect();
        assert_eq!(commands, vec![Command::HorizontalRight, Command::HorizontalLeft]);
        assert!(seq.checkpoint().is_initial());
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_checkpoint_advance() {
        let mut state = CheckpointState::INITIAL;
        state.advance();
        assert_eq!(
            state,
            CheckpointState {
                target: Checkpoint::B,
                previous: Checkpoint::A
            }
        );
        state.advance();
        assert!(state.is_initial());
    }
}
