//! Longitudinal shower models.
//!
//! Models are implemented as small, pure functions so that fitting code can
//! stay generic.

pub mod model;
pub mod reference;

pub use model::*;
pub use reference::*;
