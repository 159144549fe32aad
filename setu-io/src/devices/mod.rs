//! Device implementations

#[cfg(feature = "mock")]
pub mod mock;
