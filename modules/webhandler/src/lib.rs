//! Handler-mapping reconciliation module for HANDLERSYNC
//!
//! Implements the Get/Test/Set convergence triad over one named handler
//! mapping:
//! - Read-projection of raw store entries into a typed state record
//! - Field-level comparison of desired against current state
//! - Minimal store mutation (create, field-update, or remove) to converge

pub mod compare;
pub mod reader;
pub mod resource;
pub mod writer;

pub use compare::*;
pub use reader::*;
pub use resource::*;
pub use writer::*;
