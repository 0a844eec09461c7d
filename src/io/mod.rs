//! Input/output helpers.
//!
//! - histogram sources (`source`)
//! - JSON/CSV histogram ingest (`ingest`)
//! - layer table CSV export (`export`)
//! - fit report JSON read/write (`curve`)

pub mod curve;
pub mod export;
pub mod ingest;
pub mod source;

pub use curve::*;
pub use export::*;
pub use ingest::*;
pub use source::*;
