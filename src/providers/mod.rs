//! Concrete provider implementations.

pub mod control_plane;
pub mod oauth;
pub mod postgres;

#[cfg(feature = "mock")]
pub mod mock;
