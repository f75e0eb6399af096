//! Core types for HANDLERSYNC
//!
//! Defines the handler-mapping data model shared across the system.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

/// Store section holding handler-mapping entries.
pub const HANDLERS_SECTION: &str = "system.webServer/handlers";

/// Store attribute names for handler entries.
pub const ATTR_NAME: &str = "name";
pub const ATTR_PATH: &str = "path";
pub const ATTR_VERB: &str = "verb";
pub const ATTR_TYPE: &str = "type";
pub const ATTR_MODULES: &str = "modules";
pub const ATTR_SCRIPT_PROCESSOR: &str = "scriptProcessor";
pub const ATTR_PRE_CONDITION: &str = "preCondition";
pub const ATTR_REQUIRE_ACCESS: &str = "requireAccess";
pub const ATTR_RESOURCE_TYPE: &str = "resourceType";
pub const ATTR_ALLOW_PATH_INFO: &str = "allowPathInfo";
pub const ATTR_RESPONSE_BUFFER_LIMIT: &str = "responseBufferLimit";

/// Whether an entry should exist in the store.
///
/// On the read path this is always derived from store presence, never
/// supplied by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ensure {
    Present,
    Absent,
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ensure::Present => write!(f, "Present"),
            Ensure::Absent => write!(f, "Absent"),
        }
    }
}

/// Access rights required of a handler's physical resource.
///
/// Closed set: invalid spellings are rejected at construction rather than at
/// the store boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessRights {
    None,
    Read,
    Write,
    Script,
    Execute,
}

impl AccessRights {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessRights::None => "None",
            AccessRights::Read => "Read",
            AccessRights::Write => "Write",
            AccessRights::Script => "Script",
            AccessRights::Execute => "Execute",
        }
    }
}

impl fmt::Display for AccessRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccessRights {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(AccessRights::None),
            "Read" => Ok(AccessRights::Read),
            "Write" => Ok(AccessRights::Write),
            "Script" => Ok(AccessRights::Script),
            "Execute" => Ok(AccessRights::Execute),
            other => Err(SyncError::InvalidAccessRights(other.to_string())),
        }
    }
}

/// Ordered path identifying a configuration node in the store hierarchy.
///
/// Together with an entry name this is the full identity of a handler
/// mapping. An empty path addresses the store root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopePath(Vec<String>);

impl ScopePath {
    pub fn root() -> Self {
        ScopePath(Vec::new())
    }

    /// Build a scope from path segments. Segments must be non-empty.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = Vec::new();
        for segment in segments {
            let segment = segment.into();
            if segment.is_empty() {
                return Err(SyncError::InvalidScope(
                    "empty path segment".to_string(),
                ));
            }
            out.push(segment);
        }
        Ok(ScopePath(out))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl FromStr for ScopePath {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(ScopePath::root());
        }
        ScopePath::from_segments(s.split('/'))
    }
}

/// A store attribute value in the store's native representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrValue {
    Text(String),
    Flag(bool),
    Number(u64),
    Access(AccessRights),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(s) => write!(f, "{}", s),
            AttrValue::Flag(b) => write!(f, "{}", b),
            AttrValue::Number(n) => write!(f, "{}", n),
            AttrValue::Access(a) => write!(f, "{}", a),
        }
    }
}

/// Ordered attribute name → value map, the unit of store reads and writes.
pub type AttributeMap = BTreeMap<String, AttrValue>;

/// Structured filter expression selecting store entries.
///
/// Renders to the store's native filter syntax via `Display`, e.g.
/// `system.webServer/handlers/add[@name='cgi']`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFilter {
    section: String,
    name: Option<String>,
}

impl EntryFilter {
    /// Filter selecting a whole entry collection.
    pub fn collection(section: impl Into<String>) -> Self {
        EntryFilter {
            section: section.into(),
            name: None,
        }
    }

    /// Filter selecting the single entry with the given name attribute.
    pub fn named(section: impl Into<String>, name: impl Into<String>) -> Self {
        EntryFilter {
            section: section.into(),
            name: Some(name.into()),
        }
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for EntryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}/add[@name='{}']", self.section, name),
            None => write!(f, "{}", self.section),
        }
    }
}

/// Settable handler fields, used for drift reporting and attribute mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    PhysicalHandlerPath,
    Verb,
    HandlerType,
    Modules,
    ScriptProcessor,
    PreCondition,
    RequireAccess,
    ResourceType,
    AllowPathInfo,
    ResponseBufferLimit,
}

impl Field {
    /// The store attribute this field reads from and writes to.
    ///
    /// The physical path field is the one rename: callers know it as
    /// `PhysicalHandlerPath`, the store spells it `path`.
    pub fn store_attribute(&self) -> &'static str {
        match self {
            Field::PhysicalHandlerPath => ATTR_PATH,
            Field::Verb => ATTR_VERB,
            Field::HandlerType => ATTR_TYPE,
            Field::Modules => ATTR_MODULES,
            Field::ScriptProcessor => ATTR_SCRIPT_PROCESSOR,
            Field::PreCondition => ATTR_PRE_CONDITION,
            Field::RequireAccess => ATTR_REQUIRE_ACCESS,
            Field::ResourceType => ATTR_RESOURCE_TYPE,
            Field::AllowPathInfo => ATTR_ALLOW_PATH_INFO,
            Field::ResponseBufferLimit => ATTR_RESPONSE_BUFFER_LIMIT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::PhysicalHandlerPath => "PhysicalHandlerPath",
            Field::Verb => "Verb",
            Field::HandlerType => "Type",
            Field::Modules => "Modules",
            Field::ScriptProcessor => "ScriptProcessor",
            Field::PreCondition => "PreCondition",
            Field::RequireAccess => "RequireAccess",
            Field::ResourceType => "ResourceType",
            Field::AllowPathInfo => "AllowPathInfo",
            Field::ResponseBufferLimit => "ResponseBufferLimit",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Field {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [Field; 10] = [
            Field::PhysicalHandlerPath,
            Field::Verb,
            Field::HandlerType,
            Field::Modules,
            Field::ScriptProcessor,
            Field::PreCondition,
            Field::RequireAccess,
            Field::ResourceType,
            Field::AllowPathInfo,
            Field::ResponseBufferLimit,
        ];
        ALL.iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| SyncError::UnknownField(s.to_string()))
    }
}

/// Observed state of one handler mapping.
///
/// Transient projection of a store query; never cached across calls. The
/// store remains the sole source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerState {
    pub name: String,
    pub scope: ScopePath,
    pub ensure: Ensure,
    pub physical_handler_path: Option<String>,
    pub verb: Option<String>,
    pub handler_type: Option<String>,
    pub modules: Option<String>,
    pub script_processor: Option<String>,
    pub pre_condition: Option<String>,
    pub require_access: Option<AccessRights>,
    pub resource_type: Option<String>,
    pub allow_path_info: Option<bool>,
    pub response_buffer_limit: Option<u64>,
}

impl HandlerState {
    /// State for an entry the store does not contain.
    pub fn absent(name: impl Into<String>, scope: ScopePath) -> Self {
        HandlerState {
            name: name.into(),
            scope,
            ensure: Ensure::Absent,
            physical_handler_path: None,
            verb: None,
            handler_type: None,
            modules: None,
            script_processor: None,
            pre_condition: None,
            require_access: None,
            resource_type: None,
            allow_path_info: None,
            response_buffer_limit: None,
        }
    }

    pub fn is_present(&self) -> bool {
        self.ensure == Ensure::Present
    }
}

/// One desired field: not managed, explicitly cleared, or pinned to a value.
///
/// `Unspecified` fields never participate in comparison or mutation, which is
/// what lets partial-specification callers avoid false drift on fields they
/// never intended to manage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DesiredField<T> {
    #[default]
    Unspecified,
    Clear,
    Set(T),
}

impl<T> DesiredField<T> {
    pub fn is_unspecified(&self) -> bool {
        matches!(self, DesiredField::Unspecified)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            DesiredField::Set(value) => Some(value),
            _ => None,
        }
    }
}

/// Desired state of one handler mapping, as declared by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredHandler {
    pub ensure: Ensure,
    pub physical_handler_path: DesiredField<String>,
    pub verb: DesiredField<String>,
    pub handler_type: DesiredField<String>,
    pub modules: DesiredField<String>,
    pub script_processor: DesiredField<String>,
    pub pre_condition: DesiredField<String>,
    pub require_access: DesiredField<AccessRights>,
    pub resource_type: DesiredField<String>,
    pub allow_path_info: DesiredField<bool>,
    pub response_buffer_limit: DesiredField<u64>,
}

impl DesiredHandler {
    /// Desired state requiring presence, with no fields managed yet.
    pub fn present() -> Self {
        DesiredHandler {
            ensure: Ensure::Present,
            physical_handler_path: DesiredField::Unspecified,
            verb: DesiredField::Unspecified,
            handler_type: DesiredField::Unspecified,
            modules: DesiredField::Unspecified,
            script_processor: DesiredField::Unspecified,
            pre_condition: DesiredField::Unspecified,
            require_access: DesiredField::Unspecified,
            resource_type: DesiredField::Unspecified,
            allow_path_info: DesiredField::Unspecified,
            response_buffer_limit: DesiredField::Unspecified,
        }
    }

    /// Desired state requiring absence.
    pub fn absent() -> Self {
        DesiredHandler {
            ensure: Ensure::Absent,
            ..DesiredHandler::present()
        }
    }

    pub fn physical_handler_path(mut self, value: impl Into<String>) -> Self {
        self.physical_handler_path = DesiredField::Set(value.into());
        self
    }

    pub fn verb(mut self, value: impl Into<String>) -> Self {
        self.verb = DesiredField::Set(value.into());
        self
    }

    pub fn handler_type(mut self, value: impl Into<String>) -> Self {
        self.handler_type = DesiredField::Set(value.into());
        self
    }

    pub fn modules(mut self, value: impl Into<String>) -> Self {
        self.modules = DesiredField::Set(value.into());
        self
    }

    pub fn script_processor(mut self, value: impl Into<String>) -> Self {
        self.script_processor = DesiredField::Set(value.into());
        self
    }

    pub fn pre_condition(mut self, value: impl Into<String>) -> Self {
        self.pre_condition = DesiredField::Set(value.into());
        self
    }

    pub fn require_access(mut self, value: AccessRights) -> Self {
        self.require_access = DesiredField::Set(value);
        self
    }

    pub fn resource_type(mut self, value: impl Into<String>) -> Self {
        self.resource_type = DesiredField::Set(value.into());
        self
    }

    pub fn allow_path_info(mut self, value: bool) -> Self {
        self.allow_path_info = DesiredField::Set(value);
        self
    }

    pub fn response_buffer_limit(mut self, value: u64) -> Self {
        self.response_buffer_limit = DesiredField::Set(value);
        self
    }

    /// Mark a field as explicitly cleared.
    ///
    /// Only text fields have a cleared representation (the empty string) in
    /// the store; clearing a boolean, numeric, or access-rights field is
    /// rejected here, at construction.
    pub fn clear(mut self, field: Field) -> Result<Self, SyncError> {
        match field {
            Field::PhysicalHandlerPath => self.physical_handler_path = DesiredField::Clear,
            Field::Verb => self.verb = DesiredField::Clear,
            Field::HandlerType => self.handler_type = DesiredField::Clear,
            Field::Modules => self.modules = DesiredField::Clear,
            Field::ScriptProcessor => self.script_processor = DesiredField::Clear,
            Field::PreCondition => self.pre_condition = DesiredField::Clear,
            Field::ResourceType => self.resource_type = DesiredField::Clear,
            Field::RequireAccess
            | Field::AllowPathInfo
            | Field::ResponseBufferLimit => {
                return Err(SyncError::FieldNotClearable(field));
            }
        }
        Ok(self)
    }

    /// Map every managed field to its store attribute value.
    ///
    /// Unspecified fields are omitted, so a set-property call built from this
    /// map is a partial update. Cleared fields map to the empty string (text
    /// fields only, guaranteed by `clear`).
    pub fn attribute_map(&self) -> AttributeMap {
        let mut map = AttributeMap::new();
        text_attr(&mut map, Field::PhysicalHandlerPath, &self.physical_handler_path);
        text_attr(&mut map, Field::Verb, &self.verb);
        text_attr(&mut map, Field::HandlerType, &self.handler_type);
        text_attr(&mut map, Field::Modules, &self.modules);
        text_attr(&mut map, Field::ScriptProcessor, &self.script_processor);
        text_attr(&mut map, Field::PreCondition, &self.pre_condition);
        text_attr(&mut map, Field::ResourceType, &self.resource_type);
        if let DesiredField::Set(access) = &self.require_access {
            map.insert(
                Field::RequireAccess.store_attribute().to_string(),
                AttrValue::Access(*access),
            );
        }
        if let DesiredField::Set(flag) = &self.allow_path_info {
            map.insert(
                Field::AllowPathInfo.store_attribute().to_string(),
                AttrValue::Flag(*flag),
            );
        }
        if let DesiredField::Set(limit) = &self.response_buffer_limit {
            map.insert(
                Field::ResponseBufferLimit.store_attribute().to_string(),
                AttrValue::Number(*limit),
            );
        }
        map
    }
}

fn text_attr(map: &mut AttributeMap, field: Field, value: &DesiredField<String>) {
    let attr = match value {
        DesiredField::Unspecified => return,
        DesiredField::Clear => AttrValue::Text(String::new()),
        DesiredField::Set(text) => AttrValue::Text(text.clone()),
    };
    map.insert(field.store_attribute().to_string(), attr);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_path_parse() {
        let scope: ScopePath = "Default Web Site/app".parse().unwrap();
        assert_eq!(scope.segments(), &["Default Web Site", "app"]);
        assert_eq!(scope.to_string(), "Default Web Site/app");
    }

    #[test]
    fn test_scope_path_root() {
        let scope: ScopePath = "".parse().unwrap();
        assert!(scope.is_root());
    }

    #[test]
    fn test_scope_path_rejects_empty_segment() {
        assert!("site//app".parse::<ScopePath>().is_err());
    }

    #[test]
    fn test_access_rights_round_trip() {
        for spelling in ["None", "Read", "Write", "Script", "Execute"] {
            let access: AccessRights = spelling.parse().unwrap();
            assert_eq!(access.to_string(), spelling);
        }
        assert!("read".parse::<AccessRights>().is_err());
    }

    #[test]
    fn test_filter_display() {
        let filter = EntryFilter::named(HANDLERS_SECTION, "cgi");
        assert_eq!(
            filter.to_string(),
            "system.webServer/handlers/add[@name='cgi']"
        );
        let collection = EntryFilter::collection(HANDLERS_SECTION);
        assert_eq!(collection.to_string(), "system.webServer/handlers");
    }

    #[test]
    fn test_attribute_map_renames_path() {
        let desired = DesiredHandler::present()
            .physical_handler_path("C:\\inetpub\\handler.dll")
            .verb("GET");
        let map = desired.attribute_map();
        assert_eq!(
            map.get("path"),
            Some(&AttrValue::Text("C:\\inetpub\\handler.dll".to_string()))
        );
        assert!(!map.contains_key("PhysicalHandlerPath"));
        assert_eq!(map.get("verb"), Some(&AttrValue::Text("GET".to_string())));
    }

    #[test]
    fn test_attribute_map_omits_unspecified() {
        let desired = DesiredHandler::present().verb("GET");
        let map = desired.attribute_map();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_clear_text_field() {
        let desired = DesiredHandler::present().clear(Field::PreCondition).unwrap();
        let map = desired.attribute_map();
        assert_eq!(
            map.get("preCondition"),
            Some(&AttrValue::Text(String::new()))
        );
    }

    #[test]
    fn test_clear_rejected_for_non_text_field() {
        let err = DesiredHandler::present()
            .clear(Field::ResponseBufferLimit)
            .unwrap_err();
        assert!(matches!(err, SyncError::FieldNotClearable(_)));
    }

    #[test]
    fn test_field_parse() {
        assert_eq!(
            "requireaccess".parse::<Field>().unwrap(),
            Field::RequireAccess
        );
        assert!("bogus".parse::<Field>().is_err());
    }
}
