//! StateReader - projects store entries into typed handler state

use handlersync_core::{
    AccessRights, AttrValue, AttributeMap, Ensure, EntryFilter, HandlerState, ScopePath,
    SharedConfigStore, SyncError, SyncResult, ATTR_ALLOW_PATH_INFO, ATTR_MODULES, ATTR_PATH,
    ATTR_PRE_CONDITION, ATTR_REQUIRE_ACCESS, ATTR_RESOURCE_TYPE, ATTR_RESPONSE_BUFFER_LIMIT,
    ATTR_SCRIPT_PROCESSOR, ATTR_TYPE, ATTR_VERB, ENTRY_PROPERTY, HANDLERS_SECTION,
};
use tracing::debug;

/// Reads the current state of one handler mapping from the store.
///
/// Read-only: a query failure propagates and the caller never receives a
/// partially populated state.
#[derive(Clone)]
pub struct StateReader {
    store: SharedConfigStore,
}

impl StateReader {
    pub fn new(store: SharedConfigStore) -> Self {
        Self { store }
    }

    /// Project the store entry for (name, scope) into a `HandlerState`.
    ///
    /// A missing entry yields `Ensure::Absent` with every optional field
    /// unset.
    pub fn read(&self, name: &str, scope: &ScopePath) -> SyncResult<HandlerState> {
        let filter = EntryFilter::named(HANDLERS_SECTION, name);
        let Some(attributes) = self
            .store
            .query_by_filter(scope, &filter, ENTRY_PROPERTY)?
        else {
            debug!("No handler '{}' within scope '{}'", name, scope);
            return Ok(HandlerState::absent(name, scope.clone()));
        };
        project(name, scope, &attributes)
    }
}

/// Copy store attributes verbatim into a present `HandlerState`.
fn project(
    name: &str,
    scope: &ScopePath,
    attributes: &AttributeMap,
) -> SyncResult<HandlerState> {
    let mut state = HandlerState::absent(name, scope.clone());
    state.ensure = Ensure::Present;
    state.physical_handler_path = text_field(attributes, ATTR_PATH)?;
    state.verb = text_field(attributes, ATTR_VERB)?;
    state.handler_type = text_field(attributes, ATTR_TYPE)?;
    state.modules = text_field(attributes, ATTR_MODULES)?;
    state.script_processor = text_field(attributes, ATTR_SCRIPT_PROCESSOR)?;
    state.pre_condition = text_field(attributes, ATTR_PRE_CONDITION)?;
    state.require_access = access_field(attributes)?;
    state.resource_type = text_field(attributes, ATTR_RESOURCE_TYPE)?;
    state.allow_path_info = flag_field(attributes, ATTR_ALLOW_PATH_INFO)?;
    state.response_buffer_limit = number_field(attributes, ATTR_RESPONSE_BUFFER_LIMIT)?;
    Ok(state)
}

fn text_field(attributes: &AttributeMap, attr: &str) -> SyncResult<Option<String>> {
    match attributes.get(attr) {
        None => Ok(None),
        Some(AttrValue::Text(value)) => Ok(Some(value.clone())),
        Some(other) => Err(type_mismatch(attr, "text", other)),
    }
}

fn flag_field(attributes: &AttributeMap, attr: &str) -> SyncResult<Option<bool>> {
    match attributes.get(attr) {
        None => Ok(None),
        Some(AttrValue::Flag(value)) => Ok(Some(*value)),
        Some(other) => Err(type_mismatch(attr, "flag", other)),
    }
}

fn number_field(attributes: &AttributeMap, attr: &str) -> SyncResult<Option<u64>> {
    match attributes.get(attr) {
        None => Ok(None),
        Some(AttrValue::Number(value)) => Ok(Some(*value)),
        Some(other) => Err(type_mismatch(attr, "number", other)),
    }
}

/// The access-rights attribute may arrive as the enumerated value or as its
/// text spelling; invalid spellings are rejected here rather than compared.
fn access_field(attributes: &AttributeMap) -> SyncResult<Option<AccessRights>> {
    match attributes.get(ATTR_REQUIRE_ACCESS) {
        None => Ok(None),
        Some(AttrValue::Access(value)) => Ok(Some(*value)),
        Some(AttrValue::Text(spelling)) => Ok(Some(spelling.parse()?)),
        Some(other) => Err(type_mismatch(ATTR_REQUIRE_ACCESS, "access rights", other)),
    }
}

fn type_mismatch(attr: &str, expected: &str, got: &AttrValue) -> SyncError {
    SyncError::StoreQueryFailed(format!(
        "attribute '{}' is not a {} value: {:?}",
        attr, expected, got
    ))
}
