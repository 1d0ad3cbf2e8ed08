#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! Асинхронный опрос IMU с барометром и датчиком влажности
//!
//! [`engine::SamplingEngine`] владеет устройствами и отдаёт измерения
//! синхронно (`read_sync`) или через исполнителя (`read`/`run_worker`).
//! Одновременно выполняется не больше одного чтения.

#[macro_use]
mod logging;

pub mod config;
pub mod data;
pub mod drivers;
pub mod engine;
pub mod sensors;
pub mod tasks;
pub mod utils;

pub use config::DeviceConfig;
pub use data::{Capabilities, Measurement, RawSample, Vector3};
pub use engine::{DefaultEngine, DeviceNotFound, ReadError, SamplingEngine};
pub use sensors::MeasurementDecoder;
