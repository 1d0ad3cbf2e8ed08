//! Тестовые устройства со счётчиками вызовов
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use imu_sampler::data::{RawSample, Vector3};
use imu_sampler::drivers::{
    DeviceError, HumidityDevice, ImuDevice, ImuType, PressureDevice, PressureReading, SensorProbe,
};
use imu_sampler::{DeviceConfig, SamplingEngine};

pub type TestEngine = SamplingEngine<CriticalSectionRawMutex, MockImu, MockPressure, MockHumidity>;

#[derive(Default)]
pub struct Counters {
    pub imu_probes: AtomicUsize,
    pub imu_inits: AtomicUsize,
    pub imu_reads: AtomicUsize,
    pub pressure_probes: AtomicUsize,
    pub pressure_inits: AtomicUsize,
    pub humidity_probes: AtomicUsize,
    pub humidity_inits: AtomicUsize,
    /// Чтений, выполняемых прямо сейчас
    pub active_reads: AtomicUsize,
    /// Сколько раз чтения пересеклись
    pub overlaps: AtomicUsize,
    pub slerp_power_bits: AtomicU32,
    pub gyro: AtomicBool,
    pub accel: AtomicBool,
    pub compass: AtomicBool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImuMode {
    /// Данные готовы при каждом чтении
    AlwaysReady,
    /// Нечётные чтения без данных, чётные с данными
    Alternating,
    NeverReady,
    Faulty,
}

pub struct MockImu {
    imu_type: ImuType,
    fail_init: bool,
    mode: ImuMode,
    read_delay: StdDuration,
    counters: Arc<Counters>,
}

impl MockImu {
    fn sample(n: usize) -> RawSample {
        RawSample {
            timestamp_us: n as u64 * 1_000,
            accel: Vector3::new(0.0, 0.0, 1.0),
            gyro: Vector3::new(0.0, 0.0, 0.01 * n as f32),
            compass: Vector3::new(20.0, 0.0, -40.0),
            fusion_pose: Vector3::zeros(),
            ..RawSample::default()
        }
    }
}

impl ImuDevice for MockImu {
    fn imu_type(&self) -> ImuType {
        self.imu_type
    }

    fn init(&mut self) -> Result<(), DeviceError> {
        self.counters.imu_inits.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            Err(DeviceError::Bus)
        } else {
            Ok(())
        }
    }

    fn set_slerp_power(&mut self, power: f32) {
        self.counters
            .slerp_power_bits
            .store(power.to_bits(), Ordering::SeqCst);
    }

    fn set_gyro_enable(&mut self, enable: bool) {
        self.counters.gyro.store(enable, Ordering::SeqCst);
    }

    fn set_accel_enable(&mut self, enable: bool) {
        self.counters.accel.store(enable, Ordering::SeqCst);
    }

    fn set_compass_enable(&mut self, enable: bool) {
        self.counters.compass.store(enable, Ordering::SeqCst);
    }

    fn read(&mut self) -> Result<Option<RawSample>, DeviceError> {
        if self.counters.active_reads.fetch_add(1, Ordering::SeqCst) > 0 {
            self.counters.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if !self.read_delay.is_zero() {
            thread::sleep(self.read_delay);
        }
        let n = self.counters.imu_reads.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.active_reads.fetch_sub(1, Ordering::SeqCst);

        match self.mode {
            ImuMode::AlwaysReady => Ok(Some(Self::sample(n))),
            ImuMode::Alternating if n % 2 == 0 => Ok(Some(Self::sample(n))),
            ImuMode::Alternating | ImuMode::NeverReady => Ok(None),
            ImuMode::Faulty => Err(DeviceError::Bus),
        }
    }
}

pub struct MockPressure {
    fail_init: bool,
    fail_read: bool,
    counters: Arc<Counters>,
}

impl PressureDevice for MockPressure {
    fn init(&mut self) -> Result<(), DeviceError> {
        self.counters.pressure_inits.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            Err(DeviceError::NotInitialized)
        } else {
            Ok(())
        }
    }

    fn read(&mut self) -> Result<PressureReading, DeviceError> {
        if self.fail_read {
            return Err(DeviceError::InvalidData);
        }
        Ok(PressureReading {
            pressure: 1000.5,
            temperature: 22.0,
        })
    }
}

pub struct MockHumidity {
    fail_init: bool,
    counters: Arc<Counters>,
}

impl HumidityDevice for MockHumidity {
    fn init(&mut self) -> Result<(), DeviceError> {
        self.counters.humidity_inits.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            Err(DeviceError::Bus)
        } else {
            Ok(())
        }
    }

    fn read(&mut self) -> Result<f32, DeviceError> {
        Ok(45.0)
    }
}

/// Описание платы, которую «находит» проба
pub struct MockProbe {
    pub imu: Option<ImuType>,
    pub imu_fail_init: bool,
    pub mode: ImuMode,
    pub read_delay: StdDuration,
    pub pressure: bool,
    pub pressure_fail_init: bool,
    pub pressure_fail_read: bool,
    pub humidity: bool,
    pub humidity_fail_init: bool,
    pub counters: Arc<Counters>,
}

impl MockProbe {
    pub fn full_board(mode: ImuMode) -> Self {
        Self {
            imu: Some(ImuType::Lsm9ds1),
            imu_fail_init: false,
            mode,
            read_delay: StdDuration::ZERO,
            pressure: true,
            pressure_fail_init: false,
            pressure_fail_read: false,
            humidity: true,
            humidity_fail_init: false,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn build(&mut self) -> Result<TestEngine, imu_sampler::DeviceNotFound> {
        TestEngine::new(&DeviceConfig::default(), self)
    }
}

impl SensorProbe for MockProbe {
    type Imu = MockImu;
    type Pressure = MockPressure;
    type Humidity = MockHumidity;

    fn create_imu(&mut self, _config: &DeviceConfig) -> Option<MockImu> {
        self.counters.imu_probes.fetch_add(1, Ordering::SeqCst);
        self.imu.map(|imu_type| MockImu {
            imu_type,
            fail_init: self.imu_fail_init,
            mode: self.mode,
            read_delay: self.read_delay,
            counters: self.counters.clone(),
        })
    }

    fn create_pressure(&mut self, _config: &DeviceConfig) -> Option<MockPressure> {
        self.counters.pressure_probes.fetch_add(1, Ordering::SeqCst);
        self.pressure.then(|| MockPressure {
            fail_init: self.pressure_fail_init,
            fail_read: self.pressure_fail_read,
            counters: self.counters.clone(),
        })
    }

    fn create_humidity(&mut self, _config: &DeviceConfig) -> Option<MockHumidity> {
        self.counters.humidity_probes.fetch_add(1, Ordering::SeqCst);
        self.humidity.then(|| MockHumidity {
            fail_init: self.humidity_fail_init,
            counters: self.counters.clone(),
        })
    }
}

/// Запускает исполнитель чтений в отдельном потоке на время `f`
pub fn with_worker<R>(engine: &TestEngine, f: impl FnOnce() -> R) -> R {
    thread::scope(|s| {
        // остановка и при панике в `f`, иначе поток исполнителя не завершится
        let _stop = StopOnDrop(engine);
        s.spawn(|| block_on(engine.run_worker()));
        f()
    })
}

struct StopOnDrop<'a>(&'a TestEngine);

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        self.0.shutdown();
    }
}
