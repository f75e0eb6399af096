//! Persistent configuration store using sled database

use handlersync_core::{
    AttrValue, AttributeMap, ConfigStore, EntryFilter, ScopePath, SyncError, SyncResult,
    ATTR_NAME, ENTRY_PROPERTY, HANDLERS_SECTION,
};
use sled::{Db, Tree};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const ENTRIES_TREE: &str = "entries";

/// Separator between the scope, section, and name parts of an entry key.
const KEY_SEP: u8 = 0x1f;

/// Build the sled key for one entry.
fn entry_key(scope: &ScopePath, section: &str, name: &str) -> Vec<u8> {
    let scope = scope.to_string();
    let mut key = Vec::with_capacity(scope.len() + section.len() + name.len() + 2);
    key.extend_from_slice(scope.as_bytes());
    key.push(KEY_SEP);
    key.extend_from_slice(section.as_bytes());
    key.push(KEY_SEP);
    key.extend_from_slice(name.as_bytes());
    key
}

/// Persistent configuration store backed by a sled database.
///
/// One tree of JSON-encoded attribute maps keyed by (scope, section, name).
/// Keyed storage makes duplicate names within one scope unrepresentable, so
/// this backend never reports ambiguity.
pub struct PersistentConfigStore {
    db: Db,
    entries: Tree,
}

impl PersistentConfigStore {
    pub fn open<P: AsRef<Path>>(path: P) -> SyncResult<Self> {
        let db = sled::open(path).map_err(|e| SyncError::StoreQueryFailed(e.to_string()))?;
        let entries = db
            .open_tree(ENTRIES_TREE)
            .map_err(|e| SyncError::StoreQueryFailed(e.to_string()))?;
        Ok(Self { db, entries })
    }

    fn load(&self, key: &[u8]) -> SyncResult<Option<AttributeMap>> {
        let Some(bytes) = self
            .entries
            .get(key)
            .map_err(|e| SyncError::StoreQueryFailed(e.to_string()))?
        else {
            return Ok(None);
        };
        let attributes = serde_json::from_slice(&bytes)
            .map_err(|e| SyncError::StoreQueryFailed(e.to_string()))?;
        Ok(Some(attributes))
    }

    fn save(&self, key: &[u8], attributes: &AttributeMap) -> SyncResult<()> {
        let bytes = serde_json::to_vec(attributes)
            .map_err(|e| SyncError::StoreMutationFailed(e.to_string()))?;
        self.entries
            .insert(key, bytes)
            .map_err(|e| SyncError::StoreMutationFailed(e.to_string()))?;
        self.db
            .flush()
            .map_err(|e| SyncError::StoreMutationFailed(e.to_string()))?;
        Ok(())
    }

    fn named_filter_key(
        scope: &ScopePath,
        filter: &EntryFilter,
    ) -> SyncResult<Vec<u8>> {
        let name = filter.name().ok_or_else(|| {
            SyncError::StoreQueryFailed(format!(
                "filter '{}' has no name predicate",
                filter
            ))
        })?;
        Ok(entry_key(scope, filter.section(), name))
    }
}

impl ConfigStore for PersistentConfigStore {
    fn query_by_filter(
        &self,
        scope: &ScopePath,
        filter: &EntryFilter,
        property: &str,
    ) -> SyncResult<Option<AttributeMap>> {
        let key = Self::named_filter_key(scope, filter)?;
        let Some(attributes) = self.load(&key)? else {
            return Ok(None);
        };
        if property == ENTRY_PROPERTY {
            return Ok(Some(attributes));
        }
        Ok(Some(
            attributes
                .into_iter()
                .filter(|(attr, _)| attr == property)
                .collect(),
        ))
    }

    fn set_property(
        &self,
        scope: &ScopePath,
        filter: &EntryFilter,
        _property: &str,
        values: &AttributeMap,
    ) -> SyncResult<()> {
        let key = Self::named_filter_key(scope, filter)?;
        let Some(mut attributes) = self.load(&key)? else {
            return Err(SyncError::StoreMutationFailed(format!(
                "no entry matches filter '{}'",
                filter
            )));
        };
        for (attr, value) in values {
            attributes.insert(attr.clone(), value.clone());
        }
        self.save(&key, &attributes)?;
        debug!("Updated entry {} within scope '{}'", filter, scope);
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
            Some(AttrValue::Text(name)) => name.clone(),
            _ => {
                return Err(SyncError::StoreMutationFailed(
                    "add requires a text 'name' attribute".to_string(),
                ))
            }
        };
        let key = entry_key(scope, collection.section(), &name);
        if self.load(&key)?.is_some() {
            return Err(SyncError::StoreMutationFailed(format!(
                "entry '{}' already exists in collection '{}'",
                name, collection
            )));
        }
        self.save(&key, values)?;
        debug!("Added entry '{}' within scope '{}'", name, scope);
        Ok(())
    }

    fn remove_entry(&self, scope: &ScopePath, name: &str) -> SyncResult<()> {
        let key = entry_key(scope, HANDLERS_SECTION, name);
        let removed = self
            .entries
            .remove(&key)
            .map_err(|e| SyncError::StoreMutationFailed(e.to_string()))?;
        if removed.is_none() {
            return Err(SyncError::StoreMutationFailed(format!(
                "no entry '{}' within scope '{}'",
                name, scope
            )));
        }
        self.db
            .flush()
            .map_err(|e| SyncError::StoreMutationFailed(e.to_string()))?;
        debug!("Removed entry '{}' within scope '{}'", name, scope);
        Ok(())
    }
}

/// Thread-safe persistent store wrapper
pub type SharedPersistentConfigStore = Arc<PersistentConfigStore>;

/// Open a shared persistent store
pub fn create_persistent_store<P: AsRef<Path>>(
    path: P,
) -> SyncResult<SharedPersistentConfigStore> {
    Ok(Arc::new(PersistentConfigStore::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scope() -> ScopePath {
        "Default Web Site/app".parse().unwrap()
    }

    fn cgi_attributes() -> AttributeMap {
        let mut map = AttributeMap::new();
        map.insert(ATTR_NAME.to_string(), AttrValue::Text("cgi".to_string()));
        map.insert("verb".to_string(), AttrValue::Text("GET".to_string()));
        map
    }

    #[test]
    fn test_persistent_store_basic() {
        let tmp = TempDir::new().unwrap();
        let store = PersistentConfigStore::open(tmp.path()).unwrap();

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

        store.remove_entry(&scope(), "cgi").unwrap();
        let result = store
            .query_by_filter(&scope(), &filter, ENTRY_PROPERTY)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_persistent_store_reopen() {
        let tmp = TempDir::new().unwrap();

        // Write data
        {
            let store = PersistentConfigStore::open(tmp.path()).unwrap();
            let collection = EntryFilter::collection(HANDLERS_SECTION);
            store
                .add_entry(&scope(), &collection, ENTRY_PROPERTY, &cgi_attributes())
                .unwrap();
        }

        // Reopen and verify
        {
            let store = PersistentConfigStore::open(tmp.path()).unwrap();
            let filter = EntryFilter::named(HANDLERS_SECTION, "cgi");
            let attributes = store
                .query_by_filter(&scope(), &filter, ENTRY_PROPERTY)
                .unwrap()
                .unwrap();
            assert_eq!(
                attributes.get(ATTR_NAME),
                Some(&AttrValue::Text("cgi".to_string()))
            );
        }
    }

    #[test]
    fn test_set_property_merges() {
        let tmp = TempDir::new().unwrap();
        let store = PersistentConfigStore::open(tmp.path()).unwrap();

        let collection = EntryFilter::collection(HANDLERS_SECTION);
        store
            .add_entry(&scope(), &collection, ENTRY_PROPERTY, &cgi_attributes())
            .unwrap();

        let filter = EntryFilter::named(HANDLERS_SECTION, "cgi");
        let mut update = AttributeMap::new();
        update.insert("allowPathInfo".to_string(), AttrValue::Flag(true));
        store
            .set_property(&scope(), &filter, ENTRY_PROPERTY, &update)
            .unwrap();

        let attributes = store
            .query_by_filter(&scope(), &filter, ENTRY_PROPERTY)
            .unwrap()
            .unwrap();
        assert_eq!(attributes.get("allowPathInfo"), Some(&AttrValue::Flag(true)));
        assert_eq!(
            attributes.get("verb"),
            Some(&AttrValue::Text("GET".to_string()))
        );
    }

    #[test]
    fn test_duplicate_add_fails() {
        let tmp = TempDir::new().unwrap();
        let store = PersistentConfigStore::open(tmp.path()).unwrap();

        let collection = EntryFilter::collection(HANDLERS_SECTION);
        store
            .add_entry(&scope(), &collection, ENTRY_PROPERTY, &cgi_attributes())
            .unwrap();
        let err = store
            .add_entry(&scope(), &collection, ENTRY_PROPERTY, &cgi_attributes())
            .unwrap_err();
        assert!(matches!(err, SyncError::StoreMutationFailed(_)));
    }
}
