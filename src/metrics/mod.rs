pub mod collector;
pub mod percentiles;
pub mod stream;

pub use collector::{MetricsCollector, StoreMetrics};

/// Which side of the store a timed call hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Read,
    Write,
}

/// One timed store round trip, recorded by handlers and background writers.
#[derive(Debug, Clone, Copy)]
pub struct StoreCall {
    pub op: StoreOp,
    /// Wall time of the store call in microseconds
    pub micros: u64,
    /// false when the store returned an error or timed out
    pub success: bool,
}
