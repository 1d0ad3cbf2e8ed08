//! Параметры опроса датчиков

/// Параметры слияния данных (выполняется внутри драйвера IMU)
pub mod fusion {
    /// Степень SLERP-интерполяции фильтра ориентации
    pub const SLERP_POWER: f32 = 0.02;
}

/// Параметры системы опроса
pub mod system {
    /// Максимум заявок на асинхронное чтение в очереди
    pub const DISPATCH_QUEUE_SIZE: usize = 8;

    /// Размер буфера канала измерений
    pub const SAMPLE_CHANNEL_SIZE: usize = 10;

    /// Период синхронного опроса по умолчанию (мс)
    pub const POLL_INTERVAL_MS: u64 = 50;

    /// Подряд идущих сбоев чтения до остановки потокового опроса
    pub const MAX_CONSECUTIVE_FAULTS: u32 = 100;
}

/// Ресурс настроек устройства
pub mod settings {
    /// Имя набора настроек по умолчанию
    pub const DEFAULT_SETTINGS_NAME: &str = "RTIMULib";
}
