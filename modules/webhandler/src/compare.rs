//! StateComparator - field-level diff of desired against current state
//!
//! The comparator is pure: it takes the desired and current records and
//! returns a verdict plus the list of drifted fields. It never touches the
//! store.

use handlersync_core::{DesiredField, DesiredHandler, Ensure, Field, HandlerState};

/// Outcome of one comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convergence {
    /// Current state matches every explicitly-specified desired field.
    pub converged: bool,
    /// Fields whose current value differs from the desired value, for
    /// verbose diagnostic reporting. Empty in the ensure-mismatch cases.
    pub drift: Vec<Field>,
}

impl Convergence {
    fn verdict(converged: bool) -> Self {
        Convergence {
            converged,
            drift: Vec::new(),
        }
    }
}

/// Compare the caller's desired state against the current state.
///
/// Only fields the caller explicitly specified participate; unspecified
/// fields never report drift. String comparison is exact and case-sensitive.
pub fn compare(desired: &DesiredHandler, current: &HandlerState) -> Convergence {
    match desired.ensure {
        // Absence is a whole-entry question; no field diff applies.
        Ensure::Absent => Convergence::verdict(current.ensure == Ensure::Absent),
        Ensure::Present => {
            if !current.is_present() {
                return Convergence::verdict(false);
            }

            let mut drift = Vec::new();
            check_text(
                &mut drift,
                Field::PhysicalHandlerPath,
                &desired.physical_handler_path,
                current.physical_handler_path.as_ref(),
            );
            check_text(&mut drift, Field::Verb, &desired.verb, current.verb.as_ref());
            check_text(
                &mut drift,
                Field::HandlerType,
                &desired.handler_type,
                current.handler_type.as_ref(),
            );
            check_text(
                &mut drift,
                Field::Modules,
                &desired.modules,
                current.modules.as_ref(),
            );
            check_text(
                &mut drift,
                Field::ScriptProcessor,
                &desired.script_processor,
                current.script_processor.as_ref(),
            );
            check_text(
                &mut drift,
                Field::PreCondition,
                &desired.pre_condition,
                current.pre_condition.as_ref(),
            );
            check_value(
                &mut drift,
                Field::RequireAccess,
                &desired.require_access,
                current.require_access.as_ref(),
            );
            check_text(
                &mut drift,
                Field::ResourceType,
                &desired.resource_type,
                current.resource_type.as_ref(),
            );
            check_value(
                &mut drift,
                Field::AllowPathInfo,
                &desired.allow_path_info,
                current.allow_path_info.as_ref(),
            );
            check_value(
                &mut drift,
                Field::ResponseBufferLimit,
                &desired.response_buffer_limit,
                current.response_buffer_limit.as_ref(),
            );

            Convergence {
                converged: drift.is_empty(),
                drift,
            }
        }
    }
}

/// Text fields clear to the empty string in the store, so an unset attribute
/// and an empty one both satisfy `Clear`.
fn check_text(
    drift: &mut Vec<Field>,
    field: Field,
    desired: &DesiredField<String>,
    current: Option<&String>,
) {
    let drifted = match desired {
        DesiredField::Unspecified => false,
        DesiredField::Clear => current.is_some_and(|value| !value.is_empty()),
        DesiredField::Set(want) => current != Some(want),
    };
    if drifted {
        drift.push(field);
    }
}

fn check_value<T: PartialEq>(
    drift: &mut Vec<Field>,
    field: Field,
    desired: &DesiredField<T>,
    current: Option<&T>,
) {
    let drifted = match desired {
        DesiredField::Unspecified => false,
        DesiredField::Clear => current.is_some(),
        DesiredField::Set(want) => current != Some(want),
    };
    if drifted {
        drift.push(field);
    }
}
