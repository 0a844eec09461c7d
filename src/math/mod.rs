//! Mathematical utilities: weighted moments and the damped least-squares step.

pub mod lsq;
pub mod moments;

pub use lsq::*;
pub use moments::*;
