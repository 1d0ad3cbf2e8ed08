mod common;

use embassy_futures::{block_on, join::join};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer};

use common::{with_worker, ImuMode, MockProbe};
use imu_sampler::config::sampling::system::MAX_CONSECUTIVE_FAULTS;
use imu_sampler::tasks::sampling_task;
use imu_sampler::tasks::StopReason;
use imu_sampler::Measurement;

#[test]
fn test_stream_stops_on_shutdown() {
    let mut probe = MockProbe::full_board(ImuMode::Alternating);
    let engine = probe.build().unwrap();
    let channel = Channel::<CriticalSectionRawMutex, Measurement, 4>::new();

    let (reason, stats) = with_worker(&engine, || {
        block_on(async {
            let (result, ()) = join(
                sampling_task::run(&engine, channel.sender(), Duration::from_millis(1)),
                async {
                    for _ in 0..3 {
                        let m = channel.receive().await;
                        assert_eq!(m.humidity, Some(45.0));
                    }
                    engine.shutdown();
                },
            )
            .await;
            result
        })
    });

    assert_eq!(reason, StopReason::Closed);
    assert!(stats.delivered >= 3);
    // каждое второе чтение без данных
    assert!(stats.no_data >= 2);
    assert_eq!(stats.faults, 0);
}

#[test]
fn test_stream_gives_up_after_consecutive_faults() {
    let mut probe = MockProbe::full_board(ImuMode::Faulty);
    let engine = probe.build().unwrap();
    let channel = Channel::<CriticalSectionRawMutex, Measurement, 4>::new();

    let (reason, stats) = with_worker(&engine, || {
        block_on(sampling_task::run(
            &engine,
            channel.sender(),
            Duration::from_micros(100),
        ))
    });

    assert_eq!(reason, StopReason::TooManyFaults);
    assert_eq!(stats.faults, MAX_CONSECUTIVE_FAULTS);
    assert_eq!(stats.delivered, 0);
    assert!(channel.is_empty());
}

#[test]
fn test_full_channel_drops_measurements() {
    let mut probe = MockProbe::full_board(ImuMode::AlwaysReady);
    let engine = probe.build().unwrap();
    let channel = Channel::<CriticalSectionRawMutex, Measurement, 1>::new();

    let (reason, stats) = with_worker(&engine, || {
        block_on(async {
            let (result, ()) = join(
                sampling_task::run(&engine, channel.sender(), Duration::from_millis(1)),
                async {
                    Timer::after_millis(20).await;
                    engine.shutdown();
                },
            )
            .await;
            result
        })
    });

    assert_eq!(reason, StopReason::Closed);
    assert_eq!(stats.delivered, 1);
    assert!(stats.dropped > 0);
    assert!(channel.is_full());
}
