//! Providers Module - Chain Access
//!
//! JSON-RPC client and the retry policy wrapped around it.

pub mod retry;
pub mod rpc;

pub use retry::*;
pub use rpc::*;
