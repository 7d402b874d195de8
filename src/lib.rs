//! nsite workspace root
//!
//! Re-exports the workspace crates and carries the end-to-end tests that
//! drive them together.

pub use nsite_blossom as blossom;
pub use nsite_crypto as crypto;
pub use nsite_index as index;
pub use nsite_relay as relay;
pub use nsite_sync as sync;
