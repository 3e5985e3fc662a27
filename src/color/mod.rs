pub mod reducer;
pub mod stack;
pub mod statistics;

pub use reducer::*;
pub use stack::*;
pub use statistics::*;
