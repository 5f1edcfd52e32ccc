//! # Chat Shared
//! 
//! Shared configuration, telemetry, constants and common types for the chat
//! history crates.

pub mod constants;
pub mod types;
pub mod telemetry;
pub mod config;
pub mod error;

pub use types::*;
pub use error::AppError;
