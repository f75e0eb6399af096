//! Caller-facing Get/Test/Set triad for one handler mapping

use handlersync_core::{
    DesiredHandler, HandlerState, ScopePath, SharedConfigStore, SyncResult,
};
use tracing::{debug, info};

use crate::compare::{compare, Convergence};
use crate::reader::StateReader;
use crate::writer::StateWriter;

/// The handler-mapping resource.
///
/// The store collaborator is injected explicitly; the resource holds no
/// ambient state and caches nothing across calls. Each method is one
/// independent transaction against the store.
pub struct HandlerResource {
    reader: StateReader,
    writer: StateWriter,
}

impl HandlerResource {
    pub fn new(store: SharedConfigStore) -> Self {
        Self {
            reader: StateReader::new(store.clone()),
            writer: StateWriter::new(store),
        }
    }

    /// Current state of the named handler within `scope`.
    pub fn get(&self, name: &str, scope: &ScopePath) -> SyncResult<HandlerState> {
        self.reader.read(name, scope)
    }

    /// Whether the named handler is in the desired state.
    ///
    /// The drift list is logged for diagnostics and then discarded; a caller
    /// that wants the full diff can use [`test_verbose`](Self::test_verbose).
    pub fn test(
        &self,
        name: &str,
        scope: &ScopePath,
        desired: &DesiredHandler,
    ) -> SyncResult<bool> {
        Ok(self.test_verbose(name, scope, desired)?.converged)
    }

    /// Like [`test`](Self::test), returning the full comparison outcome.
    pub fn test_verbose(
        &self,
        name: &str,
        scope: &ScopePath,
        desired: &DesiredHandler,
    ) -> SyncResult<Convergence> {
        let current = self.reader.read(name, scope)?;
        let result = compare(desired, &current);
        if result.converged {
            debug!("Handler '{}' within scope '{}' is in desired state", name, scope);
        } else {
            info!(
                "Handler '{}' within scope '{}' is not in desired state",
                name, scope
            );
            for field in &result.drift {
                debug!("Field {} differs from its desired value", field);
            }
        }
        Ok(result)
    }

    /// Converge the named handler toward the desired state.
    pub fn set(
        &self,
        name: &str,
        scope: &ScopePath,
        desired: &DesiredHandler,
    ) -> SyncResult<()> {
        self.writer.converge(name, scope, desired)
    }
}
