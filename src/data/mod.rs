// src/data/mod.rs
use core::fmt;

use embassy_time::Instant;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Трёхкомпонентный вектор (акселерометр, гироскоп, магнитометр, ориентация)
pub type Vector3 = nalgebra::Vector3<f32>;

/// Сырой отсчёт, как его отдаёт драйвер IMU.
///
/// Поля давления, температуры и влажности заполняются дополнительными
/// датчиками в том же цикле чтения.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Время захвата отсчёта, мкс от фиксированной эпохи
    pub timestamp_us: u64,
    /// Ускорение (g)
    pub accel: Vector3,
    /// Угловая скорость (рад/с)
    pub gyro: Vector3,
    /// Магнитное поле (мкТл)
    pub compass: Vector3,
    /// Ориентация после слияния: крен, тангаж, рыскание (радианы)
    pub fusion_pose: Vector3,
    /// Давление (гПа)
    pub pressure: f32,
    /// Температура (°C)
    pub temperature: f32,
    /// Относительная влажность (%)
    pub humidity: f32,
}

impl Default for RawSample {
    fn default() -> Self {
        Self {
            timestamp_us: 0,
            accel: Vector3::zeros(),
            gyro: Vector3::zeros(),
            compass: Vector3::zeros(),
            fusion_pose: Vector3::zeros(),
            pressure: 0.0,
            temperature: 0.0,
            humidity: 0.0,
        }
    }
}

/// Набор дополнительных датчиков, доступных движку.
///
/// Фиксируется при создании движка и не меняется до его уничтожения.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Capabilities {
    /// Датчик давления (вместе с температурой)
    pub pressure: bool,
    /// Датчик влажности
    pub humidity: bool,
}

/// Декодированное измерение одного цикла опроса.
///
/// Сериализуется в запись вида
/// `{ timestamp, accel{x,y,z}, gyro{x,y,z}, compass{x,y,z}, fusionPose{x,y,z},
/// tiltHeading, [pressure, temperature], [humidity] }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    /// Время захвата, мкс от эпохи драйвера
    #[serde(rename = "timestamp", serialize_with = "serialize_timestamp")]
    pub timestamp_us: u64,
    #[serde(serialize_with = "serialize_vector3")]
    pub accel: Vector3,
    #[serde(serialize_with = "serialize_vector3")]
    pub gyro: Vector3,
    #[serde(serialize_with = "serialize_vector3")]
    pub compass: Vector3,
    #[serde(serialize_with = "serialize_vector3")]
    pub fusion_pose: Vector3,
    /// Курс по акселерометру и магнитометру, без гироскопа (радианы)
    pub tilt_heading: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f32>,
}

impl Measurement {
    /// Метка времени в миллисекундах от эпохи
    pub fn timestamp_ms(&self) -> f64 {
        self.timestamp_us as f64 * 0.001
    }

    /// Метка времени в тиках `embassy_time`.
    ///
    /// Округляется до частоты тика; точное значение в `timestamp_us`.
    pub fn timestamp(&self) -> Instant {
        Instant::from_micros(self.timestamp_us)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} ", self.timestamp_ms())?;
        write_vector3(f, "Accel", &self.accel)?;
        write_vector3(f, "Gyro", &self.gyro)?;
        write_vector3(f, "Compass", &self.compass)?;
        write_vector3(f, "Fusion", &self.fusion_pose)?;

        if let (Some(temperature), Some(pressure), Some(humidity)) =
            (self.temperature, self.pressure, self.humidity)
        {
            write!(f, " {:.4} {:.4} {:.4}", temperature, pressure, humidity)?;
        }
        Ok(())
    }
}

/// `Name:  0.1234 -0.5678  9.8000 `: неотрицательные значения дополняются пробелом
fn write_vector3(f: &mut fmt::Formatter<'_>, name: &str, v: &Vector3) -> fmt::Result {
    write!(f, "{}: ", name)?;
    for component in [v.x, v.y, v.z] {
        // -0.0 печатается как ноль
        let component = if component == 0.0 { 0.0 } else { component };
        let pad = if component >= 0.0 { " " } else { "" };
        write!(f, "{}{:.4} ", pad, component)?;
    }
    Ok(())
}

fn serialize_timestamp<S: Serializer>(timestamp_us: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(*timestamp_us as f64 * 0.001)
}

fn serialize_vector3<S: Serializer>(v: &Vector3, serializer: S) -> Result<S::Ok, S::Error> {
    let mut s = serializer.serialize_struct("Vector3", 3)?;
    s.serialize_field("x", &v.x)?;
    s.serialize_field("y", &v.y)?;
    s.serialize_field("z", &v.z)?;
    s.end()
}
