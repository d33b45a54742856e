//! Application Layer
//!
//! Contains the service contracts that the live connection core depends on.
//! This layer sits between the presentation and infrastructure layers.

pub mod services;
