//! Конфигурация устройства и параметры опроса

pub mod device;
pub mod sampling;

pub use device::DeviceConfig;
