//! Models Module - Data Structures & Configuration
//!
//! Query keys, view models, errors and configuration.
//! Contract addresses and defaults live in utils/constants.rs.

pub mod config;
pub mod errors;
pub mod query;
pub mod types;

pub use config::*;
pub use errors::*;
pub use query::*;
pub use types::*;
