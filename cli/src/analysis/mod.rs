//! Candle resampling, strat classification, signal derivation and order sizing

pub mod resample;
pub mod signal;
pub mod sizing;
pub mod strat;

pub use resample::*;
pub use signal::*;
pub use sizing::*;
pub use strat::*;
