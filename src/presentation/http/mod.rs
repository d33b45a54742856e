//! HTTP Surface
//!
//! Operational endpoints served next to the live stream.

pub mod handlers;
pub mod routes;
