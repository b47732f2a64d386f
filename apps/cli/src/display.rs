//! 终端显示
//!
//! 业务层的显示接口都是单向输出，这里直接打印到终端。

use bench_client::{JogIndicator, JogKey, RepetitionDisplay, SpeedDisplay};
use bench_protocol::Axis;
use std::sync::atomic::{AtomicI32, Ordering};

/// 重复次数显示，只在数值变化时打印
#[derive(Debug)]
pub struct ConsoleCounter {
    last: AtomicI32,
}

impl ConsoleCounter {
    pub fn new() -> Self {
        Self {
            last: AtomicI32::new(i32::MIN),
        }
    }

    pub fn last(&self) -> Option<i32> {
        match self.last.load(Ordering::Acquire) {
            i32::MIN => None,
            value => Some(value),
        }
    }
}

impl RepetitionDisplay for ConsoleCounter {
    fn show_repetitions(&self, value: i32) {
        if self.last.swap(value, Ordering::AcqRel) == value {
            return;
        }
        if value == bench_client::REPETITIONS_STOPPED {
            println!("Repetitions: stopped");
        } else {
            println!("Repetitions: {value}");
        }
    }
}

/// 点动高亮
pub struct ConsoleJog;

impl JogIndicator for ConsoleJog {
    fn highlight(&self, key: Option<JogKey>) {
        match key {
            Some(key) => println!("[{}] {} axis moving", key.as_char(), key.axis()),
            None => println!("released"),
        }
    }
}

/// 速度文本
pub struct ConsoleSpeed;

impl SpeedDisplay for ConsoleSpeed {
    fn show_speed(&self, axis: Axis, text: &str) {
        println!("{axis} speed: {text}");
    }
}
