//! In-memory configuration store for tests and dry runs

use dashmap::DashMap;
use handlersync_core::{
    AttributeMap, ConfigStore, EntryFilter, ScopePath, SyncError, SyncResult, ATTR_NAME,
    ENTRY_PROPERTY, HANDLERS_SECTION,
};
use parking_lot::RwLock;

/// Key addressing one entry collection: (scope, section).
type CollectionKey = (String, String);

/// In-memory configuration store.
///
/// Collections hold a flat list of (name, attributes) entries, so a seeded
/// store can contain duplicate names and exercise the ambiguity policy.
pub struct MemoryConfigStore {
    collections: DashMap<CollectionKey, Vec<(String, AttributeMap)>>,
    mutations: RwLock<u64>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
            mutations: RwLock::new(0),
        }
    }

    /// Seed a store with raw entries, bypassing collection invariants.
    pub fn with_entries(
        entries: Vec<(ScopePath, &str, String, AttributeMap)>,
    ) -> Self {
        let store = Self::new();
        for (scope, section, name, attributes) in entries {
            store
                .collections
                .entry((scope.to_string(), section.to_string()))
                .or_default()
                .push((name, attributes));
        }
        store
    }

    /// Number of mutation calls (add/set/remove) accepted so far.
    ///
    /// Lets tests assert idempotence at the store-mutation level.
    pub fn mutation_count(&self) -> u64 {
        *self.mutations.read()
    }

    fn record_mutation(&self) {
        *self.mutations.write() += 1;
    }

    fn key(scope: &ScopePath, section: &str) -> CollectionKey {
        (scope.to_string(), section.to_string())
    }
}

impl Default for MemoryConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Project an attribute map through the property selector.
fn select_property(attributes: &AttributeMap, property: &str) -> AttributeMap {
    if property == ENTRY_PROPERTY {
        return attributes.clone();
    }
    attributes
        .iter()
        .filter(|(key, _)| key.as_str() == property)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

impl ConfigStore for MemoryConfigStore {
    fn query_by_filter(
        &self,
        scope: &ScopePath,
        filter: &EntryFilter,
        property: &str,
    ) -> SyncResult<Option<AttributeMap>> {
        let name = filter.name().ok_or_else(|| {
            SyncError::StoreQueryFailed(format!(
                "filter '{}' has no name predicate",
                filter
            ))
        })?;

        let key = Self::key(scope, filter.section());
        let Some(collection) = self.collections.get(&key) else {
            return Ok(None);
        };

        let mut matches = collection.iter().filter(|(n, _)| n == name);
        let Some((_, attributes)) = matches.next() else {
            return Ok(None);
        };
        if matches.next().is_some() {
            return Err(SyncError::AmbiguousEntry {
                name: name.to_string(),
                scope: scope.clone(),
            });
        }

        Ok(Some(select_property(attributes, property)))
    }

    fn set_property(
        &self,
        scope: &ScopePath,
        filter: &EntryFilter,
        _property: &str,
        values: &AttributeMap,
    ) -> SyncResult<()> {
        let name = filter.name().ok_or_else(|| {
            SyncError::StoreMutationFailed(format!(
                "filter '{}' has no name predicate",
                filter
            ))
        })?;

        let key = Self::key(scope, filter.section());
        let Some(mut collection) = self.collections.get_mut(&key) else {
            return Err(SyncError::StoreMutationFailed(format!(
                "no entry matches filter '{}'",
                filter
            )));
        };
        if collection.iter().filter(|(n, _)| n == name).count() > 1 {
            return Err(SyncError::AmbiguousEntry {
                name: name.to_string(),
                scope: scope.clone(),
            });
        }
        let Some((_, attributes)) = collection.iter_mut().find(|(n, _)| n == name) else {
            return Err(SyncError::StoreMutationFailed(format!(
                "no entry matches filter '{}'",
                filter
            )));
        };
        for (attr, value) in values {
            attributes.insert(attr.clone(), value.clone());
        }
        drop(collection);
        self.record_mutation();
        Ok(())
    }

    fn add_entry(
        &self,
        scope: &ScopePath,
        collection: &EntryFilter,
        _property: &str,
        values: &AttributeMap,
    ) -> SyncResult<()> {
        let name = match values.get(ATTR_NAME) {
            Some(handlersync_core::AttrValue::Text(name)) => name.clone(),
            _ => {
                return Err(SyncError::StoreMutationFailed(
                    "add requires a text 'name' attribute".to_string(),
                ))
            }
        };

        let key = Self::key(scope, collection.section());
        let mut entries = self.collections.entry(key).or_default();
        if entries.iter().any(|(n, _)| n == &name) {
            return Err(SyncError::StoreMutationFailed(format!(
                "entry '{}' already exists in collection '{}'",
                name, collection
            )));
        }
        entries.push((name, values.clone()));
        drop(entries);
        self.record_mutation();
        Ok(())
    }

    fn remove_entry(&self, scope: &ScopePath, name: &str) -> SyncResult<()> {
        let key = Self::key(scope, HANDLERS_SECTION);
        let mut removed = false;
        if let Some(mut collection) = self.collections.get_mut(&key) {
            let before = collection.len();
            collection.retain(|(n, _)| n != name);
            removed = collection.len() != before;
        }
        if !removed {
            return Err(SyncError::StoreMutationFailed(format!(
                "no entry '{}' within scope '{}'",
                name, scope
            )));
        }
        self.record_mutation();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handlersync_core::AttrValue;

    fn scope() -> ScopePath {
        "Default Web Site".parse().unwrap()
    }

    fn cgi_attributes() -> AttributeMap {
        let mut map = AttributeMap::new();
        map.insert(ATTR_NAME.to_string(), AttrValue::Text("cgi".to_string()));
        map.insert("verb".to_string(), AttrValue::Text("GET".to_string()));
        map
    }

    #[test]
    fn test_add_then_query() {
        let store = MemoryConfigStore::new();
        let collection = EntryFilter::collection(HANDLERS_SECTION);
        store
            .add_entry(&scope(), &collection, ENTRY_PROPERTY, &cgi_attributes())
            .unwrap();

        let filter = EntryFilter::named(HANDLERS_SECTION, "cgi");
        let attributes = store
            .query_by_filter(&scope(), &filter, ENTRY_PROPERTY)
            .unwrap()
            .unwrap();
        assert_eq!(
            attributes.get("verb"),
            Some(&AttrValue::Text("GET".to_string()))
        );
        assert_eq!(store.mutation_count(), 1);
    }

    #[test]
    fn test_query_missing_is_none() {
        let store = MemoryConfigStore::new();
        let filter = EntryFilter::named(HANDLERS_SECTION, "cgi");
        let result = store
            .query_by_filter(&scope(), &filter, ENTRY_PROPERTY)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_duplicate_names_are_ambiguous() {
        let store = MemoryConfigStore::with_entries(vec![
            (scope(), HANDLERS_SECTION, "cgi".to_string(), cgi_attributes()),
            (scope(), HANDLERS_SECTION, "cgi".to_string(), cgi_attributes()),
        ]);
        let filter = EntryFilter::named(HANDLERS_SECTION, "cgi");
        let err = store
            .query_by_filter(&scope(), &filter, ENTRY_PROPERTY)
            .unwrap_err();
        assert!(matches!(err, SyncError::AmbiguousEntry { .. }));
    }

    #[test]
    fn test_set_property_is_partial() {
        let store = MemoryConfigStore::new();
        let collection = EntryFilter::collection(HANDLERS_SECTION);
        store
            .add_entry(&scope(), &collection, ENTRY_PROPERTY, &cgi_attributes())
            .unwrap();

        let filter = EntryFilter::named(HANDLERS_SECTION, "cgi");
        let mut update = AttributeMap::new();
        update.insert(
            "preCondition".to_string(),
            AttrValue::Text("integratedMode".to_string()),
        );
        store
            .set_property(&scope(), &filter, ENTRY_PROPERTY, &update)
            .unwrap();

        let attributes = store
            .query_by_filter(&scope(), &filter, ENTRY_PROPERTY)
            .unwrap()
            .unwrap();
        // Untouched attribute survives the partial update.
        assert_eq!(
            attributes.get("verb"),
            Some(&AttrValue::Text("GET".to_string()))
        );
        assert_eq!(
            attributes.get("preCondition"),
            Some(&AttrValue::Text("integratedMode".to_string()))
        );
    }

    #[test]
    fn test_set_property_without_match_fails() {
        let store = MemoryConfigStore::new();
        let filter = EntryFilter::named(HANDLERS_SECTION, "cgi");
        let err = store
            .set_property(&scope(), &filter, ENTRY_PROPERTY, &cgi_attributes())
            .unwrap_err();
        assert!(matches!(err, SyncError::StoreMutationFailed(_)));
    }

    #[test]
    fn test_remove_entry() {
        let store = MemoryConfigStore::new();
        let collection = EntryFilter::collection(HANDLERS_SECTION);
        store
            .add_entry(&scope(), &collection, ENTRY_PROPERTY, &cgi_attributes())
            .unwrap();
        store.remove_entry(&scope(), "cgi").unwrap();

        let filter = EntryFilter::named(HANDLERS_SECTION, "cgi");
        let result = store
            .query_by_filter(&scope(), &filter, ENTRY_PROPERTY)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_remove_missing_fails() {
        let store = MemoryConfigStore::new();
        let err = store.remove_entry(&scope(), "cgi").unwrap_err();
        assert!(matches!(err, SyncError::StoreMutationFailed(_)));
    }

    #[test]
    fn test_scopes_do_not_interfere() {
        let store = MemoryConfigStore::new();
        let collection = EntryFilter::collection(HANDLERS_SECTION);
        store
            .add_entry(&scope(), &collection, ENTRY_PROPERTY, &cgi_attributes())
            .unwrap();

        let other: ScopePath = "Other Site".parse().unwrap();
        let filter = EntryFilter::named(HANDLERS_SECTION, "cgi");
        let result = store
            .query_by_filter(&other, &filter, ENTRY_PROPERTY)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_property_selector() {
        let store = MemoryConfigStore::new();
        let collection = EntryFilter::collection(HANDLERS_SECTION);
        store
            .add_entry(&scope(), &collection, ENTRY_PROPERTY, &cgi_attributes())
            .unwrap();

        let filter = EntryFilter::named(HANDLERS_SECTION, "cgi");
        let verb_only = store
            .query_by_filter(&scope(), &filter, "verb")
            .unwrap()
            .unwrap();
        assert_eq!(verb_only.len(), 1);
        assert_eq!(
            verb_only.get("verb"),
            Some(&AttrValue::Text("GET".to_string()))
        );
    }
}
