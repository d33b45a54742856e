//! Application Services
//!
//! Contracts for the collaborators that live commands call into.
//!
//! ## Available Services
//!
//! - **TokenValidator**: Access token verification for authenticated commands
//! - **TypingRelay**: Typing indicator fan-out through a pub/sub bridge

pub mod auth_service;
pub mod typing_service;

// Re-export auth service types
pub use auth_service::{AuthError, Claims, JwtTokenValidator, TokenValidator};

// Re-export typing service types
pub use typing_service::{RelayError, TypingIndicator, TypingRelay};

#[cfg(test)]
pub use auth_service::MockTokenValidator;
#[cfg(test)]
pub use typing_service::MockTypingRelay;
