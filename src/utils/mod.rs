//! Utils Module - Helper Functions & Shared Utilities

pub mod cache;
pub mod constants;
pub mod decoder;
pub mod format;
pub mod logging;

pub use cache::*;
pub use constants::*;
pub use decoder::*;
pub use format::*;
pub use logging::*;
