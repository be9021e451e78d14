pub mod candle;
pub mod scan;
pub mod signal;
pub mod stock;
pub mod timeframe;
pub mod transaction;

pub use candle::*;
pub use scan::*;
pub use signal::*;
pub use stock::*;
pub use timeframe::*;
pub use transaction::*;

use chrono::{DateTime, Utc};

/// One step-to-step move recorded by the pipeline runner
#[derive(Debug, Clone)]
pub struct StepTransitionLog {
    pub from: String,
    pub to: String,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

impl StepTransitionLog {
    pub fn new(from: String, to: String, reason: String) -> Self {
        Self {
            from,
            to,
            timestamp: Utc::now(),
            reason,
        }
    }
}
