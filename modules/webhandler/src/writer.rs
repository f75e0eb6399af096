//! StateWriter - issues the minimal store mutation to converge

use handlersync_core::{
    AttrValue, DesiredHandler, Ensure, EntryFilter, ScopePath, SharedConfigStore, SyncResult,
    ATTR_NAME, ENTRY_PROPERTY, HANDLERS_SECTION,
};
use tracing::{debug, info};

use crate::compare::compare;
use crate::reader::StateReader;

/// Converges one handler mapping toward its desired state.
///
/// Always re-reads current state before acting, so the action taken matches
/// the live store at mutation time. The window between that read and the
/// mutation is an accepted race with concurrent actors; it is not detected or
/// retried here.
pub struct StateWriter {
    store: SharedConfigStore,
    reader: StateReader,
}

impl StateWriter {
    pub fn new(store: SharedConfigStore) -> Self {
        Self {
            reader: StateReader::new(store.clone()),
            store,
        }
    }

    /// Apply the minimal mutation: create, field-update, remove, or nothing.
    ///
    /// At most one store mutation call per invocation.
    pub fn converge(
        &self,
        name: &str,
        scope: &ScopePath,
        desired: &DesiredHandler,
    ) -> SyncResult<()> {
        let current = self.reader.read(name, scope)?;

        match (desired.ensure, current.ensure) {
            (Ensure::Present, Ensure::Absent) => {
                let mut values = desired.attribute_map();
                values.insert(ATTR_NAME.to_string(), AttrValue::Text(name.to_string()));
                let collection = EntryFilter::collection(HANDLERS_SECTION);
                self.store
                    .add_entry(scope, &collection, ENTRY_PROPERTY, &values)?;
                info!("Created handler '{}' within scope '{}'", name, scope);
            }
            (Ensure::Present, Ensure::Present) => {
                if compare(desired, &current).converged {
                    debug!(
                        "Handler '{}' within scope '{}' already converged",
                        name, scope
                    );
                    return Ok(());
                }
                let values = desired.attribute_map();
                let filter = EntryFilter::named(HANDLERS_SECTION, name);
                self.store
                    .set_property(scope, &filter, ENTRY_PROPERTY, &values)?;
                info!("Updated handler '{}' within scope '{}'", name, scope);
            }
            (Ensure::Absent, Ensure::Present) => {
                self.store.remove_entry(scope, name)?;
                info!("Removed handler '{}' within scope '{}'", name, scope);
            }
            (Ensure::Absent, Ensure::Absent) => {
                debug!(
                    "Handler '{}' within scope '{}' already absent",
                    name, scope
                );
            }
        }

        Ok(())
    }
}
