use thiserror::Error;

/// Validation failures raised while constructing or parsing a wire value.
///
/// These never panic the caller — invalid input is always recoverable by
/// dropping the offending value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractError {
    #[error("{field} out of range: {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("destination must have at least two waypoints, got {count}")]
    TooFewWaypoints { count: usize },

    #[error("destination name must not be empty")]
    EmptyDestinationName,

    #[error("packet timestamp {timestamp_ms} is outside the valid window around {now_ms}")]
    TimestampOutOfWindow { timestamp_ms: i64, now_ms: i64 },
}
