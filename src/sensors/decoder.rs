//! Декодирование сырых отсчётов в измерения

use crate::data::{Capabilities, Measurement, RawSample};
use crate::utils::math::pose_from_accel_mag;

/// Преобразование `RawSample` → `Measurement`.
///
/// Чистая функция от отсчёта и набора датчиков, зафиксированного при
/// создании движка. Ошибок не бывает.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementDecoder {
    capabilities: Capabilities,
}

impl MeasurementDecoder {
    pub const fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn decode(&self, raw: &RawSample) -> Measurement {
        let caps = self.capabilities;
        // курс только по акселерометру и магнитометру
        let tilt_heading = pose_from_accel_mag(&raw.accel, &raw.compass).z;

        Measurement {
            timestamp_us: raw.timestamp_us,
            accel: raw.accel,
            gyro: raw.gyro,
            compass: raw.compass,
            fusion_pose: raw.fusion_pose,
            tilt_heading,
            pressure: caps.pressure.then_some(raw.pressure),
            temperature: caps.pressure.then_some(raw.temperature),
            humidity: caps.humidity.then_some(raw.humidity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Vector3;

    fn raw() -> RawSample {
        RawSample {
            timestamp_us: 1_000_000,
            accel: Vector3::new(0.0, 0.0, 9.8),
            gyro: Vector3::new(0.01, -0.02, 0.03),
            compass: Vector3::new(0.3, 0.0, 0.1),
            fusion_pose: Vector3::new(0.1, 0.2, 0.3),
            pressure: 1013.25,
            temperature: 21.5,
            humidity: 38.0,
        }
    }

    const ALL: Capabilities = Capabilities {
        pressure: true,
        humidity: true,
    };

    #[test]
    fn test_level_board_facing_north() {
        let m = MeasurementDecoder::new(Capabilities::default()).decode(&raw());

        assert_eq!(m.timestamp().as_secs(), 1);
        assert_eq!(m.timestamp_ms(), 1000.0);
        assert_eq!(m.accel, Vector3::new(0.0, 0.0, 9.8));
        assert_eq!(m.tilt_heading, 0.0);
    }

    #[test]
    fn test_timestamp_keeps_microseconds() {
        let mut sample = raw();
        sample.timestamp_us = 1_234_567;
        let m = MeasurementDecoder::new(ALL).decode(&sample);

        assert_eq!(m.timestamp_us, 1_234_567);
        assert_eq!(m.timestamp_ms(), 1_234_567.0 * 0.001);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let decoder = MeasurementDecoder::new(ALL);
        let mut sample = raw();
        sample.accel = Vector3::new(0.3, -1.2, 9.6);
        sample.compass = Vector3::new(18.0, -4.0, -44.0);

        let a = decoder.decode(&sample);
        let b = decoder.decode(&sample);
        assert_eq!(a, b);
        assert_eq!(a.tilt_heading.to_bits(), b.tilt_heading.to_bits());
    }

    #[test]
    fn test_tilt_heading_ignores_gyro_and_fusion() {
        let decoder = MeasurementDecoder::new(ALL);
        let mut sample = raw();
        sample.compass = Vector3::new(10.0, 12.0, -40.0);
        let before = decoder.decode(&sample).tilt_heading;

        sample.gyro = Vector3::new(5.0, -5.0, 1.0);
        sample.fusion_pose = Vector3::new(-1.0, 0.5, 2.5);
        let after = decoder.decode(&sample).tilt_heading;

        assert_eq!(before.to_bits(), after.to_bits());
    }

    #[test]
    fn test_optional_fields_follow_capabilities() {
        let none = MeasurementDecoder::new(Capabilities::default()).decode(&raw());
        assert_eq!(none.pressure, None);
        assert_eq!(none.temperature, None);
        assert_eq!(none.humidity, None);

        let pressure_only = MeasurementDecoder::new(Capabilities {
            pressure: true,
            humidity: false,
        })
        .decode(&raw());
        assert_eq!(pressure_only.pressure, Some(1013.25));
        assert_eq!(pressure_only.temperature, Some(21.5));
        assert_eq!(pressure_only.humidity, None);

        let all = MeasurementDecoder::new(ALL).decode(&raw());
        assert_eq!(all.humidity, Some(38.0));
    }
}
