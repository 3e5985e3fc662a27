pub mod anchors;
pub mod estimator;
pub mod family;

pub use anchors::*;
pub use estimator::*;
pub use family::*;

pub use crate::numeric::Matrix3;
