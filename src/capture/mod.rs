mod loop_worker;
pub mod scheduler;
pub mod source;

pub use scheduler::{CaptureConfig, CaptureScheduler};
pub use source::{await_nonzero_dimensions, CaptureSource, Frame, Readiness};
