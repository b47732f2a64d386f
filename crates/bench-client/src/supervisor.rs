//! 序列监督器
//!
//! 同一时刻最多运行一个 [`Sequencer`] 工作线程。停止和暂停标志只由这里的控制调用写入，
//! 工作线程只读。序列结束后结果通过通道交回。

use crate::error::ClientError;
use crate::io::BenchIo;
use crate::sequencer::{
    CheckpointState, RepetitionDisplay, SequenceFlags, SequenceOutcome, SequenceParams, Sequencer,
    SequencerConfig,
};
use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, warn};

/// 序列类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    /// 完整程序
    Program,
    /// 单次测试往返
    Test,
}

/// `toggle` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Started,
    StopRequested,
}

/// 序列监督器
pub struct SequenceSupervisor {
    sequencer: Arc<Sequencer>,
    flags: Arc<SequenceFlags>,
    worker: Mutex<Option<JoinHandle<()>>>,
    outcome_tx: Sender<SequenceOutcome>,
    outcome_rx: Receiver<SequenceOutcome>,
}

impl SequenceSupervisor {
    pub fn new(
        io: Arc<dyn BenchIo>,
        display: Arc<dyn RepetitionDisplay>,
        config: SequencerConfig,
    ) -> Self {
        let flags = Arc::new(SequenceFlags::new());
        let sequencer = Arc::new(Sequencer::new(io, flags.clone(), display, config));
        let (outcome_tx, outcome_rx) = unbounded();
        Self {
            sequencer,
            flags,
            worker: Mutex::new(None),
            outcome_tx,
            outcome_rx,
        }
    }

    /// 启动完整程序
    pub fn start(&self, params: SequenceParams) -> Result<(), ClientError> {
        params.validate(&self.sequencer.config().limits)?;
        self.spawn(SequenceKind::Program, params)
    }

    /// 启动单次测试往返（忽略重复次数）
    pub fn start_test(&self, params: SequenceParams) -> Result<(), ClientError> {
        self.sequencer
            .config()
            .limits
            .validate(params.movement, params.amplitude_mm, params.turns)?;
        self.spawn(SequenceKind::Test, params)
    }

    fn spawn(&self, kind: SequenceKind, params: SequenceParams) -> Result<(), ClientError> {
        let mut worker = self.worker.lock();

        if let Some(handle) = worker.as_ref()
            && !handle.is_finished()
        {
            return Err(ClientError::AlreadyRunning);
        }

        // 上一个序列已结束但未清理
        if let Some(handle) = worker.take()
            && handle.join().is_err()
        {
            warn!("Previous sequence thread panicked");
        }
        self.flags.clear();
        while self.outcome_rx.try_recv().is_ok() {}

        let sequencer = self.sequencer.clone();
        let outcome_tx = self.outcome_tx.clone();
        let handle = std::thread::Builder::new()
            .name("bench-sequence".into())
            .spawn(move || {
                let outcome = match kind {
                    SequenceKind::Program => sequencer.run_program(&params),
                    SequenceKind::Test => sequencer.run_test(&params),
                };
                let _ = outcome_tx.send(outcome);
            })
            .map_err(|e| ClientError::Thread(e.to_string()))?;

        info!("Sequence started ({:?}: {})", kind, params.movement);
        *worker = Some(handle);
        Ok(())
    }

    /// 同一个控件在启动和停止之间切换
    pub fn toggle(&self, params: SequenceParams) -> Result<ToggleAction, ClientError> {
        if self.is_running() {
            self.stop();
            Ok(ToggleAction::StopRequested)
        } else {
            self.start(params)?;
            Ok(ToggleAction::Started)
        }
    }

    /// 请求停止
    ///
    /// 运行中的序列在一个轮询周期内退出并复位检查点；没有运行时直接复位检查点。
    pub fn stop(&self) {
        self.flags.request_stop();
        if !self.is_running() {
            self.sequencer.reset_checkpoint();
        }
        info!("Stop requested");
    }

    /// 暂停，重复调用与调用一次等价
    pub fn pause(&self) {
        self.flags.pause();
    }

    pub fn resume(&self) {
        self.flags.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.flags.is_paused()
    }

    /// 工作线程是否仍在运行
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn checkpoint(&self) -> CheckpointState {
        self.sequencer.checkpoint()
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// 等待序列结束，超时返回 `None`
    pub fn wait(&self, timeout: Duration) -> Option<SequenceOutcome> {
        let outcome = self.outcome_rx.recv_timeout(timeout).ok()?;
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
        Some(outcome)
    }

    /// 非阻塞地取出已结束序列的结果
    pub fn try_outcome(&self) -> Option<SequenceOutcome> {
        self.outcome_rx.try_recv().ok()
    }
}

impl Drop for SequenceSupervisor {
    fn drop(&mut self) {
        self.flags.request_stop();
        if let Some(handle) = self.worker.get_mut().take()
            && handle.join().is_err()
        {
            warn!("Sequence thread panicked");
        }
    }
}
