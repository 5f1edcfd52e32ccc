//! # Chat Core
//! 
//! Domain entities, repository and cache ports, and the cache-aside
//! conversation service.

pub mod domain;
pub mod services;
pub mod repositories;
pub mod error;

// Re-export domain entities
pub use domain::*;
pub use error::ChatError;
