//! HANDLERSYNC Core Library
//!
//! Core types, traits, and abstractions for declarative reconciliation of
//! HTTP handler mappings. This crate provides the foundation for all other
//! HANDLERSYNC components.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use traits::*;
pub use types::*;
