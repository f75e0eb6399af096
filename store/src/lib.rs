//! HANDLERSYNC Store Backends
//!
//! Implementations of the `ConfigStore` collaborator: an in-memory store for
//! tests and dry runs, and a sled-backed persistent store for the CLI.

pub mod memory;
pub mod persistent;

pub use memory::*;
pub use persistent::*;
