//! Library side of the derivation CLI: logging setup, the study pipeline and
//! summary rendering.

pub mod logging;
pub mod pipeline;
pub mod summary;
pub mod types;
