pub mod loader;
pub mod transformer;

pub use loader::*;
pub use transformer::*;
