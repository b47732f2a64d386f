//! Link 集成测试
//!
//! 使用模拟串口适配器验证读线程、设备状态和链路状态的联动。

use bench_driver::mock::{MockSerialAdapter, StubDeviceConfig};
use bench_driver::{Link, LinkStatus, PipelineConfig};
use bench_protocol::*;
use std::time::Duration;

fn config(frame_variant: FrameVariant) -> PipelineConfig {
    PipelineConfig {
        poll_interval_ms: 1,
        read_timeout_ms: 5,
        frame_variant,
    }
}

fn wait_until(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    panic!("timed out waiting for {what}");
}

#[test]
fn compact_frames_keep_last_position() {
    let (adapter, handle) = MockSerialAdapter::with_variant("mock-compact", FrameVariant::Compact);
    let link = Link::new(adapter, Some(config(FrameVariant::Compact))).unwrap();

    handle.push_status(StatusFrame {
        id: 4,
        movement_status: 1,
        motor_state: MotorState::InTrajectory,
        position: None,
    });
    wait_until("first compact frame", || link.device_state().update_count == 1);

    let state = link.device_state();
    assert_eq!(state.motor_state, MotorState::InTrajectory);
    assert_eq!(state.position, 0);
}

#[test]
fn short_read_then_full_frame() {
    let (adapter, handle) = MockSerialAdapter::new("mock-short");
    let link = Link::new(adapter, Some(config(FrameVariant::Extended))).unwrap();

    handle.push_raw(vec![0xFF, 0xFF]);
    handle.push_status(StatusFrame {
        id: 7,
        movement_status: 0,
        motor_state: MotorState::EndOfTrajectory,
        position: Some(1250),
    });
    wait_until("full frame after short read", || link.device_state().update_count == 1);

    assert_eq!(link.device_state().position, 1250);
    let metrics = link.metrics();
    assert_eq!(metrics.rx_short_reads, 1);
    assert_eq!(metrics.rx_frames_total, 1);
}

#[test]
fn stub_device_reports_trajectory_through_link() {
    let stub = StubDeviceConfig {
        trajectory_hold: Duration::from_millis(30),
        report_interval: Duration::from_millis(1),
        frame_variant: FrameVariant::Extended,
    };
    let (adapter, handle) = MockSerialAdapter::with_stub("stub", stub);
    let link = Link::new(adapter, Some(config(FrameVariant::Extended))).unwrap();

    link.send(&CommandFrame::position(
        ComponentId::MotorHorizontal,
        Command::HorizontalRight,
        120,
    ))
    .unwrap();

    wait_until("in trajectory", || {
        link.device_state().motor_state == MotorState::InTrajectory
    });
    wait_until("end of trajectory", || {
        link.device_state().motor_state == MotorState::EndOfTrajectory
    });
    assert_eq!(link.device_state().position, 120);
    assert_eq!(handle.sent_frames().len(), 1);
}

#[test]
fn unplugged_device_disconnects_link() {
    let (adapter, handle) = MockSerialAdapter::new("mock-unplug");
    let link = Link::new(adapter, Some(config(FrameVariant::Extended))).unwrap();
    assert_eq!(link.status(), LinkStatus::Connected);

    handle.unplug();
    wait_until("disconnect", || link.status() == LinkStatus::Disconnected);
    assert!(link.metrics().device_errors >= 1);

    // 没有句柄时的自由函数发送只记录日志
    bench_driver::send(
        &CommandFrame::manual(ComponentId::MotorVerticalLeft, Command::VerticalStop),
        Some(&link),
    );
    bench_driver::send(
        &CommandFrame::manual(ComponentId::MotorVerticalLeft, Command::VerticalStop),
        None,
    );
}

#[test]
fn connect_to_missing_port_returns_none() {
    assert!(bench_driver::connect("/dev/definitely-not-a-bench-port").is_none());
}
