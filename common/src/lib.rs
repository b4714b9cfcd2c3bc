//! Common Utilities and Types Library
//! 
//! This crate provides the configuration vocabulary and the pure conversion
//! helpers shared by the channel model and the simulation tooling.

pub mod types;
pub mod utils;

// Re-export commonly used items
pub use types::*;
pub use utils::*;
