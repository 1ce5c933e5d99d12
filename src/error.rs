use alloc::string::String;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{what} must be positive, got {value}")]
    NonPositive { what: &'static str, value: f64 },
    #[error("{what} must be in (0, 1], got {value}")]
    SpeedOutOfRange { what: &'static str, value: f64 },
    #[error("encoder ticks per revolution must be non-zero")]
    ZeroTicksPerRevolution,
    #[error("zone `{0}` has a non-finite vertex")]
    NonFiniteVertex(String),
    #[error("control period must be non-zero")]
    ZeroPeriod,
}

#[derive(Debug, Error)]
pub enum RoutineError {
    #[error("routine blob could not be decoded: {0}")]
    Decode(postcard::Error),
    #[error("routine could not be encoded: {0}")]
    Encode(postcard::Error),
    #[error("step {index}: {reason}")]
    InvalidStep { index: usize, reason: &'static str },
    #[error("no routine named `{0}`")]
    Unknown(String),
}
