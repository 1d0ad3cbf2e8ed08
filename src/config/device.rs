//! Конфигурация IMU-устройства

use super::sampling::{fusion::SLERP_POWER, settings::DEFAULT_SETTINGS_NAME};

/// Настройки, передаваемые драйверам при создании устройств.
///
/// Для движка опроса непрозрачны: он только применяет параметры слияния
/// и включение датчиков к IMU после инициализации.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceConfig {
    /// Имя ресурса настроек драйвера
    pub settings_name: &'static str,
    /// Степень SLERP-интерполяции
    pub slerp_power: f32,
    /// Включение гироскопа
    pub gyro_enable: bool,
    /// Включение акселерометра
    pub accel_enable: bool,
    /// Включение магнитометра
    pub compass_enable: bool,
}

impl DeviceConfig {
    /// Конфигурация с заданным набором настроек и параметрами по умолчанию
    pub const fn new(settings_name: &'static str) -> Self {
        Self {
            settings_name,
            slerp_power: SLERP_POWER,
            gyro_enable: true,
            accel_enable: true,
            compass_enable: true,
        }
    }

    pub const fn with_slerp_power(mut self, slerp_power: f32) -> Self {
        self.slerp_power = slerp_power;
        self
    }

    pub const fn with_gyro(mut self, enable: bool) -> Self {
        self.gyro_enable = enable;
        self
    }

    pub const fn with_accel(mut self, enable: bool) -> Self {
        self.accel_enable = enable;
        self
    }

    pub const fn with_compass(mut self, enable: bool) -> Self {
        self.compass_enable = enable;
        self
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SETTINGS_NAME)
    }
}
