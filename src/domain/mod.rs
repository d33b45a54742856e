//! # Domain Layer
//!
//! The domain layer holds the records pushed to live viewers and the
//! contracts for fetching them. It is independent of any external
//! frameworks or infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: Content records and their repository trait

pub mod entities;

// Re-export commonly used types
pub use entities::*;
