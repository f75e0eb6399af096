//! Core traits defining HANDLERSYNC interfaces
//!
//! The store collaborator contract every backend must implement.

use std::sync::Arc;

use crate::types::{AttributeMap, EntryFilter, ScopePath};

/// Result type for HANDLERSYNC operations
pub type SyncResult<T> = Result<T, crate::error::SyncError>;

/// The external hierarchical configuration store.
///
/// Every method is a single synchronous, blocking transaction against the
/// store; no handle survives past its return. The store is a shared external
/// resource with last-writer-wins semantics for property sets, and may be
/// mutated concurrently by actors outside this process.
pub trait ConfigStore: Send + Sync {
    /// Query the entry selected by `filter` within `scope`, returning the
    /// named property's attributes, or `None` when no entry matches.
    ///
    /// More than one matching entry is a query failure, not a choice.
    fn query_by_filter(
        &self,
        scope: &ScopePath,
        filter: &EntryFilter,
        property: &str,
    ) -> SyncResult<Option<AttributeMap>>;

    /// Set attributes on the entry selected by `filter`. Attributes not in
    /// `values` are left untouched (partial update, not full replace).
    fn set_property(
        &self,
        scope: &ScopePath,
        filter: &EntryFilter,
        property: &str,
        values: &AttributeMap,
    ) -> SyncResult<()>;

    /// Add a new entry to the collection selected by `collection`.
    fn add_entry(
        &self,
        scope: &ScopePath,
        collection: &EntryFilter,
        property: &str,
        values: &AttributeMap,
    ) -> SyncResult<()>;

    /// Remove the handler entry with the given name from `scope`.
    fn remove_entry(&self, scope: &ScopePath, name: &str) -> SyncResult<()>;
}

/// Shared store handle passed to components as an explicit collaborator.
pub type SharedConfigStore = Arc<dyn ConfigStore>;

/// The whole-entry property selector: queries and mutations address the
/// entry itself rather than a single named attribute.
pub const ENTRY_PROPERTY: &str = ".";
