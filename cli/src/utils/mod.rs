pub mod fs;
pub mod logger;

pub use fs::*;
pub use logger::*;
