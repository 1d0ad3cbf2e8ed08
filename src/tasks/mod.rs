pub mod dispatch;
pub mod sampling_task;

pub use dispatch::{Closed, Completion, Dispatch};
pub use sampling_task::{SamplingStats, StopReason};
