pub mod decoder;

pub use decoder::MeasurementDecoder;
