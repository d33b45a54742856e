//! # Domain Entities
//!
//! Core domain entities delivered over live connections.
//!
//! ## Entities
//!
//! - **ContentRecord**: a listing with photos, localized names, author and tags
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer, following the
//! dependency inversion principle.

mod content;

pub use content::{ContentAuthor, ContentRecord, ContentRepository};

#[cfg(test)]
pub use content::MockContentRepository;
