// src/drivers/sim.rs
//! Программная модель платы с IMU, барометром и датчиком влажности
//!
//! Повторяет набор Sense HAT (LSM9DS1 + LPS25H + HTS221). Данные детерминированы:
//! одинаковая последовательность вызовов даёт одинаковые отсчёты.

use libm::{cosf, sinf};

use crate::config::DeviceConfig;
use crate::data::{RawSample, Vector3};

use super::{
    DeviceError, HumidityDevice, ImuDevice, ImuType, PressureDevice, PressureReading, SensorProbe,
};

/// Период дискретизации модели по умолчанию (мкс), 100 Гц
pub const DEFAULT_PERIOD_US: u64 = 10_000;

/// Ускорение свободного падения в единицах модели
const GRAVITY: f32 = 1.0;
/// Модуль горизонтальной составляющей магнитного поля (мкТл)
const FIELD_HORIZONTAL: f32 = 20.0;
/// Вертикальная составляющая магнитного поля (мкТл)
const FIELD_VERTICAL: f32 = -45.0;
/// Скорость вращения модели вокруг вертикали (рад/с)
const YAW_RATE: f32 = 0.1;

pub struct SimImu {
    initialized: bool,
    /// Каждый `ready_every`-й опрос возвращает отсчёт
    ready_every: u32,
    polls: u32,
    period_us: u64,
    timestamp_us: u64,
    slerp_power: f32,
    gyro_enable: bool,
    accel_enable: bool,
    compass_enable: bool,
}

impl SimImu {
    pub fn new(ready_every: u32) -> Self {
        Self {
            initialized: false,
            ready_every: ready_every.max(1),
            polls: 0,
            period_us: DEFAULT_PERIOD_US,
            timestamp_us: 0,
            slerp_power: 0.0,
            gyro_enable: false,
            accel_enable: false,
            compass_enable: false,
        }
    }

    pub fn with_period_us(mut self, period_us: u64) -> Self {
        self.period_us = period_us;
        self
    }

    pub fn slerp_power(&self) -> f32 {
        self.slerp_power
    }

    /// Флаги (гироскоп, акселерометр, магнитометр)
    pub fn enables(&self) -> (bool, bool, bool) {
        (self.gyro_enable, self.accel_enable, self.compass_enable)
    }

    fn sample_at(&self, timestamp_us: u64) -> RawSample {
        let t = timestamp_us as f32 * 1e-6;
        let yaw = YAW_RATE * t;

        let accel = if self.accel_enable {
            Vector3::new(0.0, 0.0, GRAVITY)
        } else {
            Vector3::zeros()
        };
        let gyro = if self.gyro_enable {
            Vector3::new(0.0, 0.0, YAW_RATE)
        } else {
            Vector3::zeros()
        };
        // поле вращается в связанной системе навстречу повороту платы
        let compass = if self.compass_enable {
            Vector3::new(
                FIELD_HORIZONTAL * cosf(yaw),
                -FIELD_HORIZONTAL * sinf(yaw),
                FIELD_VERTICAL,
            )
        } else {
            Vector3::zeros()
        };

        RawSample {
            timestamp_us,
            accel,
            gyro,
            compass,
            fusion_pose: Vector3::new(0.0, 0.0, yaw),
            ..RawSample::default()
        }
    }
}

impl ImuDevice for SimImu {
    fn imu_type(&self) -> ImuType {
        ImuType::Simulated
    }

    fn init(&mut self) -> Result<(), DeviceError> {
        self.initialized = true;
        Ok(())
    }

    fn set_slerp_power(&mut self, power: f32) {
        self.slerp_power = power;
    }

    fn set_gyro_enable(&mut self, enable: bool) {
        self.gyro_enable = enable;
    }

    fn set_accel_enable(&mut self, enable: bool) {
        self.accel_enable = enable;
    }

    fn set_compass_enable(&mut self, enable: bool) {
        self.compass_enable = enable;
    }

    fn read(&mut self) -> Result<Option<RawSample>, DeviceError> {
        if !self.initialized {
            return Err(DeviceError::NotInitialized);
        }

        self.polls = self.polls.wrapping_add(1);
        if self.polls % self.ready_every != 0 {
            return Ok(None);
        }

        self.timestamp_us += self.period_us;
        Ok(Some(self.sample_at(self.timestamp_us)))
    }
}

pub struct SimPressure {
    initialized: bool,
    fail_init: bool,
    pressure: f32,
    temperature: f32,
}

impl SimPressure {
    pub fn new() -> Self {
        Self {
            initialized: false,
            fail_init: false,
            pressure: 1013.25,
            temperature: 25.0,
        }
    }

    /// Модель барометра, который не отвечает при инициализации
    pub fn failing() -> Self {
        Self {
            fail_init: true,
            ..Self::new()
        }
    }
}

impl Default for SimPressure {
    fn default() -> Self {
        Self::new()
    }
}

impl PressureDevice for SimPressure {
    fn init(&mut self) -> Result<(), DeviceError> {
        if self.fail_init {
            return Err(DeviceError::Bus);
        }
        self.initialized = true;
        Ok(())
    }

    fn read(&mut self) -> Result<PressureReading, DeviceError> {
        if !self.initialized {
            return Err(DeviceError::NotInitialized);
        }
        Ok(PressureReading {
            pressure: self.pressure,
            temperature: self.temperature,
        })
    }
}

pub struct SimHumidity {
    initialized: bool,
    humidity: f32,
}

impl SimHumidity {
    pub fn new() -> Self {
        Self {
            initialized: false,
            humidity: 40.0,
        }
    }
}

impl Default for SimHumidity {
    fn default() -> Self {
        Self::new()
    }
}

impl HumidityDevice for SimHumidity {
    fn init(&mut self) -> Result<(), DeviceError> {
        self.initialized = true;
        Ok(())
    }

    fn read(&mut self) -> Result<f32, DeviceError> {
        if !self.initialized {
            return Err(DeviceError::NotInitialized);
        }
        Ok(self.humidity)
    }
}

/// Проба, «находящая» модели устройств
pub struct SimProbe {
    ready_every: u32,
    pressure: bool,
    humidity: bool,
}

impl SimProbe {
    /// Полный набор: IMU, барометр и датчик влажности
    pub fn sense_hat() -> Self {
        Self {
            ready_every: 2,
            pressure: true,
            humidity: true,
        }
    }

    /// Только IMU
    pub fn imu_only() -> Self {
        Self {
            ready_every: 2,
            pressure: false,
            humidity: false,
        }
    }

    pub fn with_ready_every(mut self, ready_every: u32) -> Self {
        self.ready_every = ready_every;
        self
    }
}

impl SensorProbe for SimProbe {
    type Imu = SimImu;
    type Pressure = SimPressure;
    type Humidity = SimHumidity;

    fn create_imu(&mut self, _config: &DeviceConfig) -> Option<SimImu> {
        Some(SimImu::new(self.ready_every))
    }

    fn create_pressure(&mut self, _config: &DeviceConfig) -> Option<SimPressure> {
        self.pressure.then(SimPressure::new)
    }

    fn create_humidity(&mut self, _config: &DeviceConfig) -> Option<SimHumidity> {
        self.humidity.then(SimHumidity::new)
    }
}
