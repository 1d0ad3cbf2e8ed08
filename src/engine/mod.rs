//! Движок опроса IMU
//!
//! Владеет устройствами и сериализует доступ к ним: синхронные и
//! асинхронные чтения стоят в одной очереди и выполняются по одному,
//! в порядке поступления.

use core::fmt;

use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::mutex::Mutex;

use crate::config::sampling::system::DISPATCH_QUEUE_SIZE;
use crate::config::DeviceConfig;
use crate::data::{Capabilities, Measurement, RawSample};
use crate::drivers::{
    DeviceError, HumidityDevice, ImuDevice, ImuType, PressureDevice, SensorProbe,
};
use crate::sensors::MeasurementDecoder;
use crate::tasks::dispatch::{Closed, Dispatch};

pub mod host;

/// Движок не может быть создан: основной датчик ориентации не найден
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceNotFound {
    /// Проба не нашла IMU
    Missing,
    /// Найден пустой драйвер
    NullType,
    /// IMU найден, но не инициализировался
    InitFailed(DeviceError),
}

impl fmt::Display for DeviceNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceNotFound::Missing => f.write_str("no IMU found"),
            DeviceNotFound::NullType => f.write_str("IMU driver is a null device"),
            DeviceNotFound::InitFailed(e) => write!(f, "IMU init failed: {}", e),
        }
    }
}

/// Результат одного чтения, отличный от измерения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadError {
    /// Новых данных ещё нет, повторить позже
    NoDataYet,
    /// Ошибка ввода-вывода при чтении
    WorkerFault(DeviceError),
    /// Движок остановлен
    Closed,
}

impl From<DeviceError> for ReadError {
    fn from(e: DeviceError) -> Self {
        ReadError::WorkerFault(e)
    }
}

impl From<Closed> for ReadError {
    fn from(_: Closed) -> Self {
        ReadError::Closed
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::NoDataYet => f.write_str("no new sample yet"),
            ReadError::WorkerFault(e) => write!(f, "sensor read failed: {}", e),
            ReadError::Closed => f.write_str("sampling engine shut down"),
        }
    }
}

/// Устройства, принадлежащие движку
struct Devices<I, P, H> {
    imu: I,
    pressure: Option<P>,
    humidity: Option<H>,
}

impl<I: ImuDevice, P: PressureDevice, H: HumidityDevice> Devices<I, P, H> {
    /// Один цикл чтения: IMU, затем барометр и датчик влажности
    fn sample(&mut self) -> Result<RawSample, ReadError> {
        let mut raw = match self.imu.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Err(ReadError::NoDataYet),
            Err(e) => {
                log_warn!("Ошибка чтения IMU: {}", e);
                return Err(e.into());
            }
        };

        if let Some(pressure) = self.pressure.as_mut() {
            let reading = pressure.read()?;
            raw.pressure = reading.pressure;
            raw.temperature = reading.temperature;
        }
        if let Some(humidity) = self.humidity.as_mut() {
            raw.humidity = humidity.read()?;
        }

        Ok(raw)
    }
}

pub struct SamplingEngine<M: RawMutex, I, P, H> {
    devices: Mutex<M, Devices<I, P, H>>,
    dispatch: Dispatch<M, Result<RawSample, ReadError>, DISPATCH_QUEUE_SIZE>,
    decoder: MeasurementDecoder,
}

/// Движок с мьютексом на критической секции, как в остальной прошивке
pub type DefaultEngine<I, P, H> = SamplingEngine<CriticalSectionRawMutex, I, P, H>;

impl<M, I, P, H> SamplingEngine<M, I, P, H>
where
    M: RawMutex,
    I: ImuDevice,
    P: PressureDevice,
    H: HumidityDevice,
{
    /// Обнаружение и инициализация устройств.
    ///
    /// Без IMU движок не создаётся. Барометр и датчик влажности
    /// необязательны: при ошибке инициализации движок работает без них.
    pub fn new<S>(config: &DeviceConfig, probe: &mut S) -> Result<Self, DeviceNotFound>
    where
        S: SensorProbe<Imu = I, Pressure = P, Humidity = H>,
    {
        let Some(mut imu) = probe.create_imu(config) else {
            log_error!("IMU не найден");
            return Err(DeviceNotFound::Missing);
        };

        let imu_type = imu.imu_type();
        if imu_type == ImuType::Null {
            log_error!("Найден пустой драйвер IMU");
            return Err(DeviceNotFound::NullType);
        }

        if let Err(e) = imu.init() {
            log_error!("Ошибка инициализации IMU {:?}: {}", imu_type, e);
            return Err(DeviceNotFound::InitFailed(e));
        }
        imu.set_slerp_power(config.slerp_power);
        imu.set_gyro_enable(config.gyro_enable);
        imu.set_accel_enable(config.accel_enable);
        imu.set_compass_enable(config.compass_enable);
        log_info!("IMU {:?} инициализирован ({})", imu_type, config.settings_name);

        let pressure = probe.create_pressure(config).and_then(|mut dev| match dev.init() {
            Ok(()) => Some(dev),
            Err(e) => {
                log_warn!("Барометр не инициализирован, работа без него: {}", e);
                None
            }
        });
        let humidity = probe.create_humidity(config).and_then(|mut dev| match dev.init() {
            Ok(()) => Some(dev),
            Err(e) => {
                log_warn!("Датчик влажности не инициализирован, работа без него: {}", e);
                None
            }
        });

        let capabilities = Capabilities {
            pressure: pressure.is_some(),
            humidity: humidity.is_some(),
        };
        log_info!("Дополнительные датчики: {:?}", capabilities);

        Ok(Self {
            devices: Mutex::new(Devices {
                imu,
                pressure,
                humidity,
            }),
            dispatch: Dispatch::new(),
            decoder: MeasurementDecoder::new(capabilities),
        })
    }

    pub fn capabilities(&self) -> Capabilities {
        self.decoder.capabilities()
    }

    /// Блокирующее чтение в контексте вызывающего.
    ///
    /// Встаёт в общую очередь: выполняется после всех ранее поставленных
    /// асинхронных чтений.
    pub fn read_sync(&self) -> Result<Measurement, ReadError> {
        let raw = block_on(
            self.dispatch
                .run_inline(|| block_on(self.devices.lock()).sample()),
        )??;
        Ok(self.decoder.decode(&raw))
    }

    /// Чтение через исполнителя; вызывающий не блокируется.
    ///
    /// Заявки выполняются по одной, в порядке поступления.
    pub async fn read(&self) -> Result<Measurement, ReadError> {
        let completion = self.dispatch.submit().await?;
        let raw = completion.await??;
        Ok(self.decoder.decode(&raw))
    }

    /// `read()` с обработчиком завершения, вызываемым ровно один раз
    pub async fn read_with<F>(&self, completion: F)
    where
        F: FnOnce(Result<Measurement, ReadError>),
    {
        completion(self.read().await)
    }

    /// Цикл исполнителя асинхронных чтений; завершается после `shutdown()`.
    ///
    /// Запускается в отдельной задаче или потоке.
    pub async fn run_worker(&self) {
        log_info!("Исполнитель чтения запущен");
        let this = self;
        self.dispatch
            .serve(move || async move { this.devices.lock().await.sample() })
            .await;
        log_info!("Исполнитель чтения остановлен");
    }

    /// Остановка: новые чтения завершаются с `ReadError::Closed`,
    /// начатое чтение доводится до конца.
    pub fn shutdown(&self) {
        if !self.dispatch.is_closed() {
            log_info!("Остановка движка опроса");
        }
        self.dispatch.close();
    }

    pub fn is_shut_down(&self) -> bool {
        self.dispatch.is_closed()
    }
}
