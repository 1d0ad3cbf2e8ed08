//! Демонстрация на хосте: модель Sense HAT, синхронный опрос,
//! чтение с обработчиком и потоковый опрос через канал.

use embassy_executor::{Executor, Spawner};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Sender};
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};

use imu_sampler::config::sampling::system::{POLL_INTERVAL_MS, SAMPLE_CHANNEL_SIZE};
use imu_sampler::drivers::sim::{SimHumidity, SimImu, SimPressure, SimProbe};
use imu_sampler::engine::host;
use imu_sampler::tasks::sampling_task;
use imu_sampler::{DefaultEngine, DeviceConfig, Measurement};

type SimEngine = DefaultEngine<SimImu, SimPressure, SimHumidity>;

/// Сколько синхронных опросов и потоковых измерений показать
const DEMO_SAMPLES: usize = 10;

static MEASUREMENTS: Channel<CriticalSectionRawMutex, Measurement, SAMPLE_CHANNEL_SIZE> =
    Channel::new();

/// Исполнитель чтений вышел из `run_worker`
static WORKER_DONE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

#[embassy_executor::task]
async fn worker_task(engine: &'static SimEngine) {
    engine.run_worker().await;
    WORKER_DONE.signal(());
}

#[embassy_executor::task]
async fn stream_task(
    engine: &'static SimEngine,
    sender: Sender<'static, CriticalSectionRawMutex, Measurement, SAMPLE_CHANNEL_SIZE>,
) {
    let (reason, stats) =
        sampling_task::run(engine, sender, Duration::from_millis(POLL_INTERVAL_MS)).await;
    println!("Поток остановлен: {:?}, {:?}", reason, stats);
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let mut probe = SimProbe::sense_hat();
    let engine: &'static SimEngine = match SimEngine::new(&DeviceConfig::default(), &mut probe) {
        Ok(engine) => Box::leak(Box::new(engine)),
        Err(e) => {
            eprintln!("Ошибка: {}", e);
            std::process::exit(1);
        }
    };

    // второй исполнитель в своём потоке: чтение устройства блокирует
    std::thread::spawn(move || {
        let executor: &'static mut Executor = Box::leak(Box::new(Executor::new()));
        executor.run(|spawner| spawner.spawn(worker_task(engine)).unwrap())
    });

    println!("=== Синхронный опрос ===");
    let mut shown = 0;
    while shown < DEMO_SAMPLES {
        if let Some(measurement) = host::get_value_sync(engine) {
            println!("{}", measurement);
            shown += 1;
        }
        Timer::after_millis(POLL_INTERVAL_MS).await;
    }

    println!("=== Чтение с обработчиком ===");
    host::get_value(engine, |err, data| {
        if let Some(err) = err {
            eprintln!("Не удалось прочитать датчики: {}", err);
            return;
        }
        if let Some(data) = data {
            println!("Температура: {:?}", data.temperature);
            println!("Давление: {:?}", data.pressure);
            println!("Влажность: {:?}", data.humidity);
        }
    })
    .await;

    println!("=== Потоковый опрос ===");
    spawner
        .spawn(stream_task(engine, MEASUREMENTS.sender()))
        .unwrap();
    for _ in 0..DEMO_SAMPLES {
        let measurement = MEASUREMENTS.receive().await;
        println!("{}", measurement);
    }

    engine.shutdown();
    // дать потоковой задаче увидеть остановку
    Timer::after_millis(2 * POLL_INTERVAL_MS).await;
    WORKER_DONE.wait().await;
    std::process::exit(0);
}
