pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod numeric;
pub mod pipeline;
pub mod registration;
pub mod transform;

pub use color::*;
pub use data::*;
pub use error::{NumericFallback, RegistrationError};
pub use numeric::*;
pub use pipeline::*;
pub use registration::*;
pub use transform::*;

pub type Result<T> = std::result::Result<T, RegistrationError>;
