//! Потоковый опрос: одно асинхронное чтение на тик, измерения в канал

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Sender;
use embassy_time::{Duration, Ticker};

use crate::config::sampling::system::MAX_CONSECUTIVE_FAULTS;
use crate::data::Measurement;
use crate::drivers::{HumidityDevice, ImuDevice, PressureDevice};
use crate::engine::{ReadError, SamplingEngine};

/// Почему завершился опрос
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopReason {
    /// Движок остановлен
    Closed,
    /// `MAX_CONSECUTIVE_FAULTS` сбоев чтения подряд
    TooManyFaults,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SamplingStats {
    /// Тиков с завершённым чтением
    pub ticks: u32,
    /// Измерений отправлено в канал
    pub delivered: u32,
    /// Тиков без новых данных
    pub no_data: u32,
    pub faults: u32,
    /// Измерений потеряно из-за переполненного канала
    pub dropped: u32,
}

/// Исход одного тика
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickOutcome {
    Delivered,
    Dropped,
    NoData,
    Fault,
}

impl SamplingStats {
    /// Счётчики переполняются по кругу
    fn record(&mut self, outcome: TickOutcome) {
        self.ticks = self.ticks.wrapping_add(1);
        let counter = match outcome {
            TickOutcome::Delivered => &mut self.delivered,
            TickOutcome::Dropped => &mut self.dropped,
            TickOutcome::NoData => &mut self.no_data,
            TickOutcome::Fault => &mut self.faults,
        };
        *counter = counter.wrapping_add(1);
    }
}

pub async fn run<EM, CM, I, P, H, const N: usize>(
    engine: &SamplingEngine<EM, I, P, H>,
    sender: Sender<'_, CM, Measurement, N>,
    period: Duration,
) -> (StopReason, SamplingStats)
where
    EM: RawMutex,
    CM: RawMutex,
    I: ImuDevice,
    P: PressureDevice,
    H: HumidityDevice,
{
    log_info!("Потоковый опрос запущен, период {} мс", period.as_millis());

    let mut ticker = Ticker::every(period);
    let mut stats = SamplingStats::default();
    let mut consecutive_faults = 0u32;

    loop {
        ticker.next().await;

        match engine.read().await {
            Ok(measurement) => {
                consecutive_faults = 0;
                if sender.try_send(measurement).is_err() {
                    log_trace!("Буфер канала измерений переполнен");
                    stats.record(TickOutcome::Dropped);
                } else {
                    stats.record(TickOutcome::Delivered);
                }
            }
            Err(ReadError::NoDataYet) => {
                consecutive_faults = 0;
                stats.record(TickOutcome::NoData);
            }
            Err(ReadError::WorkerFault(e)) => {
                stats.record(TickOutcome::Fault);
                consecutive_faults += 1;
                if consecutive_faults >= MAX_CONSECUTIVE_FAULTS {
                    log_error!("Слишком много ошибок датчиков подряд: {}", e);
                    return (StopReason::TooManyFaults, stats);
                }
            }
            Err(ReadError::Closed) => {
                log_info!("Потоковый опрос остановлен");
                return (StopReason::Closed, stats);
            }
        }
    }
}
