//! Интерфейс для привязки к внешней среде
//!
//! `get_value_sync` возвращает измерение или ничего, `get_value` вызывает
//! обработчик в стиле «сначала ошибка»: `(None, Some(m))` при успехе,
//! `(Some(e), None)` иначе.

use embassy_sync::blocking_mutex::raw::RawMutex;

use super::{ReadError, SamplingEngine};
use crate::data::Measurement;
use crate::drivers::{HumidityDevice, ImuDevice, PressureDevice};

pub fn get_value_sync<M, I, P, H>(engine: &SamplingEngine<M, I, P, H>) -> Option<Measurement>
where
    M: RawMutex,
    I: ImuDevice,
    P: PressureDevice,
    H: HumidityDevice,
{
    match engine.read_sync() {
        Ok(measurement) => Some(measurement),
        Err(ReadError::NoDataYet) => None,
        Err(e) => {
            log_debug!("Синхронное чтение не удалось: {}", e);
            None
        }
    }
}

pub async fn get_value<M, I, P, H, F>(engine: &SamplingEngine<M, I, P, H>, callback: F)
where
    M: RawMutex,
    I: ImuDevice,
    P: PressureDevice,
    H: HumidityDevice,
    F: FnOnce(Option<ReadError>, Option<Measurement>),
{
    match engine.read().await {
        Ok(measurement) => callback(None, Some(measurement)),
        Err(e) => callback(Some(e), None),
    }
}
