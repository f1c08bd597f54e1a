//! Chain log source abstraction layer.
//!
//! Provides a trait-based interface over where logs and view-call results
//! come from:
//! - Ethereum JSON-RPC over HTTP
//! - Mock source for testing

pub mod mock;
pub mod rpc;
pub mod traits;

pub use mock::{fixtures, MockChainSource};
pub use rpc::JsonRpcSource;
pub use traits::{ChainError, ChainLogSource};
