//! # Bench Client
//!
//! 测试台业务逻辑层：
//! - 手动点动（按下运动、松开只停止最后动作的轴）
//! - 速度滑块（取整后变化才下发修改速度命令）
//! - 自动往返序列（检查点 A/B 交替，完整程序或单次测试）
//! - 序列监督器（同一时刻最多一个序列，协作式停止/暂停）
//!
//! 设备访问只经过 [`BenchIo`]，测试中可以替换为桩设备。
//!
//! # 示例
//!
//! ```no_run
//! use bench_client::{
//!     Movement, RepetitionCounter, SequenceParams, SequenceSupervisor, SequencerConfig, SharedLink,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let link = Arc::new(SharedLink::new());
//! link.connect("/dev/ttyUSB0")?;
//!
//! let counter = Arc::new(RepetitionCounter::new());
//! let supervisor = SequenceSupervisor::new(link, counter.clone(), SequencerConfig::default());
//! supervisor.start(SequenceParams {
//!     movement: Movement::UpToDown,
//!     amplitude_mm: 50,
//!     turns: 0.0,
//!     repetitions: 3,
//! })?;
//! let outcome = supervisor.wait(Duration::from_secs(600));
//! println!("{outcome:?}, display = {}", counter.get());
//! # Ok::<(), bench_client::ClientError>(())
//! ```

mod error;
pub mod io;
pub mod jog;
pub mod movement;
pub mod program;
pub mod sequencer;
pub mod speed;
pub mod supervisor;

pub use error::ClientError;
pub use io::{BenchIo, SharedLink};
pub use jog::{JogController, JogIndicator, JogKey};
pub use movement::{MOVEMENT_PLACEHOLDER, Movement, Trajectory, TravelLimits};
pub use program::{PROGRAM_KEYS, TestProgram};
pub use sequencer::{
    Checkpoint, CheckpointState, MAX_REPETITIONS, REPETITIONS_STOPPED, RepetitionCounter, RepetitionDisplay,
    SequenceFlags, SequenceOutcome, SequenceParams, SequencePhase, Sequencer, SequencerConfig,
};
pub use speed::{SliderSpeed, SpeedControl, SpeedDisplay, slider_for_speed};
pub use supervisor::{SequenceKind, SequenceSupervisor, ToggleAction};
