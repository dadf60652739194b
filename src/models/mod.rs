//! Data models for the resource protocol and the object store.
//!
//! Request/response shapes mirror the JSON documents the Concourse driver
//! exchanges with the `check`, `in` and `out` commands. Everything here is
//! plain data: no network or filesystem access happens in this module.

pub mod metadata;
pub mod object;
pub mod params;
pub mod request;
pub mod source;
pub mod version;
