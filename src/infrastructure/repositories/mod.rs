//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! ## Available Repositories
//!
//! - **ContentRepository** - Random content sampling for live delivery
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use live_server::infrastructure::repositories::PgContentRepository;
//!
//! let repo = PgContentRepository::new(pool);
//! let records = repo.fetch_random(5, "en").await?;
//! ```

mod content_repository;

pub use content_repository::PgContentRepository;
