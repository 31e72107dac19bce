//! Command implementations.

pub mod config;
pub mod histogram;
pub mod split;
pub mod types;
