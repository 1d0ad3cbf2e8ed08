//! Интерфейсы драйверов датчиков
//!
//! Сами драйверы (обнаружение устройства, работа с регистрами, слияние
//! данных) находятся вне этого крейта. Движку опроса нужны только
//! перечисленные здесь операции.

use core::fmt;

use crate::config::DeviceConfig;
use crate::data::RawSample;

pub mod sim;

/// Ошибки нижнего уровня
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    /// Ошибка шины (I2C/SPI)
    Bus,
    /// Датчик вернул некорректные данные
    InvalidData,
    /// Датчик не инициализирован
    NotInitialized,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Bus => f.write_str("bus error"),
            DeviceError::InvalidData => f.write_str("invalid sensor data"),
            DeviceError::NotInitialized => f.write_str("sensor not initialized"),
        }
    }
}

/// Тип обнаруженного IMU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImuType {
    /// Пустой драйвер: устройство не найдено
    Null,
    Mpu9150,
    Mpu9250,
    Lsm9ds0,
    Lsm9ds1,
    Bmx055,
    /// Программная модель (см. [`sim`])
    Simulated,
}

/// Основной датчик ориентации
pub trait ImuDevice {
    fn imu_type(&self) -> ImuType;

    fn init(&mut self) -> Result<(), DeviceError>;

    fn set_slerp_power(&mut self, power: f32);

    fn set_gyro_enable(&mut self, enable: bool);

    fn set_accel_enable(&mut self, enable: bool);

    fn set_compass_enable(&mut self, enable: bool);

    /// Блокирующее чтение одного отсчёта.
    ///
    /// `Ok(None)`: новых данных ещё нет (опрос чаще частоты дискретизации).
    fn read(&mut self) -> Result<Option<RawSample>, DeviceError>;
}

/// Показания барометра
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureReading {
    /// Давление (гПа)
    pub pressure: f32,
    /// Температура (°C)
    pub temperature: f32,
}

pub trait PressureDevice {
    fn init(&mut self) -> Result<(), DeviceError>;

    fn read(&mut self) -> Result<PressureReading, DeviceError>;
}

pub trait HumidityDevice {
    fn init(&mut self) -> Result<(), DeviceError>;

    /// Относительная влажность (%)
    fn read(&mut self) -> Result<f32, DeviceError>;
}

/// Обнаружение устройств по конфигурации.
///
/// Каждая проба возвращает `None`, если устройство отсутствует.
pub trait SensorProbe {
    type Imu: ImuDevice;
    type Pressure: PressureDevice;
    type Humidity: HumidityDevice;

    fn create_imu(&mut self, config: &DeviceConfig) -> Option<Self::Imu>;

    fn create_pressure(&mut self, config: &DeviceConfig) -> Option<Self::Pressure>;

    fn create_humidity(&mut self, config: &DeviceConfig) -> Option<Self::Humidity>;
}

/// Датчик, которого на плате нет и быть не может.
///
/// Подставляется в `SensorProbe::Pressure`/`Humidity`, когда проба
/// такого датчика никогда не находит.
#[derive(Debug)]
pub enum Absent {}

impl PressureDevice for Absent {
    fn init(&mut self) -> Result<(), DeviceError> {
        match *self {}
    }

    fn read(&mut self) -> Result<PressureReading, DeviceError> {
        match *self {}
    }
}

impl HumidityDevice for Absent {
    fn init(&mut self) -> Result<(), DeviceError> {
        match *self {}
    }

    fn read(&mut self) -> Result<f32, DeviceError> {
        match *self {}
    }
}
