//! Core services: store access, version detection and bulk transfers.
//!
//! Command handlers compose these; none of them read stdin or write stdout.

pub mod download;
#[cfg(test)]
pub mod memory_store;
pub mod pool;
pub mod s3_gateway;
pub mod store;
pub mod upload;
pub mod versions;
