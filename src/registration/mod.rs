pub mod chain;
pub mod correspondence;
pub mod log;

pub use chain::*;
pub use correspondence::*;
pub use log::*;
