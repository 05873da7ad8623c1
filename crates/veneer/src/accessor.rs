//! Forwarding accessors installed on generated classes.
//!
//! One accessor exists per forwarded attribute name. Reads consult the
//! proxy's shadow state first and fall back to the member declared on the
//! binding's owning wrapped-chain ancestor, executed in the wrapped
//! instance's context. Writes and deletes touch only the shadow state;
//! the wrapped instance is never mutated through a proxy.

use crate::class::{ClassId, Member};
use crate::error::{VeneerError, VeneerResult};
use crate::model::ObjectModel;
use crate::registry::ShadowSlot;
use crate::value::{BoundMethod, ObjRef, Value};

/// Accessor hook for one forwarded attribute name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingAccessor {
    name: String,
    owner: ClassId,
}

impl ForwardingAccessor {
    pub(crate) fn new(name: String, owner: ClassId) -> Self {
        Self { name, owner }
    }

    /// The forwarded attribute name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The most-derived wrapped-chain ancestor declaring the name
    pub fn owner(&self) -> ClassId {
        self.owner
    }

    fn missing(&self, model: &ObjectModel) -> VeneerError {
        VeneerError::AttributeMissing {
            class: model.class_label(self.owner),
            attribute: self.name.clone(),
        }
    }

    /// Read the forwarded attribute for `proxy`
    pub(crate) fn get(&self, model: &ObjectModel, proxy: &ObjRef) -> VeneerResult<Value> {
        if let Some(slot) = model.instances().shadow_slot(proxy, &self.name) {
            return match slot {
                ShadowSlot::Value(value) => Ok(value),
                ShadowSlot::Tombstone => Err(self.missing(model)),
            };
        }

        let wrapped = model.instances().get_association(proxy)?;

        // Raw lookup on the owner's own table; resolving through the
        // proxy's accessors here would recurse forever.
        match model.declared_member(self.owner, &self.name) {
            Some(Member::Field { default }) => {
                if let Some(value) = wrapped.field(&self.name) {
                    Ok(value)
                } else if let Some(value) = default {
                    Ok(value)
                } else {
                    Err(self.missing(model))
                }
            }
            Some(Member::Method(func)) => Ok(Value::Method(BoundMethod::new(
                wrapped.clone(),
                self.owner,
                func,
            ))),
            Some(Member::Getter(getter)) => getter(model, &wrapped),
            Some(Member::Forward(_)) => Err(VeneerError::Internal(format!(
                "forwarding binding {:?} resolved to another forwarding accessor on {}",
                self.name,
                model.class_label(self.owner)
            ))),
            None => Err(VeneerError::Internal(format!(
                "forwarding binding {:?} points at {}, which declares no such member",
                self.name,
                model.class_label(self.owner)
            ))),
        }
    }

    /// Shadow-write the forwarded attribute for `proxy`
    pub(crate) fn set(&self, model: &ObjectModel, proxy: &ObjRef, value: Value) -> VeneerResult<()> {
        model
            .instances()
            .write_shadow(proxy, &self.name, ShadowSlot::Value(value))
    }

    /// Tombstone the forwarded attribute for `proxy`
    pub(crate) fn delete(&self, model: &ObjectModel, proxy: &ObjRef) -> VeneerResult<()> {
        model
            .instances()
            .write_shadow(proxy, &self.name, ShadowSlot::Tombstone)
    }
}
