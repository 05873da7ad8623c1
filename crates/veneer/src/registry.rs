//! Identity-keyed association store for proxy instances.
//!
//! Each live proxy instance maps to the wrapped instance it decorates and
//! a private shadow state. Keying is by instance identity (allocation
//! address), never value equality, so two proxies wrapping value-equal
//! but distinct objects never collide.
//!
//! Proxy keys are held weakly: a proxy that is dropped without an explicit
//! release leaves a dead record that is swept opportunistically on
//! registration and on [`InstanceRegistry::purge_dead`]. The wrapped
//! instance is held strongly for as long as its proxy's record lives.

use std::collections::hash_map::Entry;
use std::sync::Weak;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{VeneerError, VeneerResult};
use crate::value::{ObjId, ObjRef, ObjectData, Value};

/// A shadow-state entry for one forwarded attribute
#[derive(Debug, Clone, PartialEq)]
pub enum ShadowSlot {
    /// Locally written value, visible only to this proxy instance
    Value(Value),
    /// Deletion marker; reads fail until the slot is overwritten
    Tombstone,
}

/// Association record for one proxy instance
struct InstanceRecord {
    proxy: Weak<ObjectData>,
    wrapped: ObjRef,
    shadow: FxHashMap<String, ShadowSlot>,
}

impl InstanceRecord {
    fn is_live(&self) -> bool {
        self.proxy.strong_count() > 0
    }
}

/// Registry of proxy-to-wrapped associations and shadow states
#[derive(Default)]
pub struct InstanceRegistry {
    records: RwLock<FxHashMap<ObjId, InstanceRecord>>,
}

impl InstanceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Establish the association for a freshly constructed proxy
    ///
    /// First-call-only per instance; the shadow state starts empty.
    pub(crate) fn set_association(&self, proxy: &ObjRef, wrapped: ObjRef) -> VeneerResult<()> {
        let mut records = self.records.write();
        records.retain(|_, record| record.is_live());

        match records.entry(proxy.id()) {
            Entry::Occupied(_) => Err(VeneerError::Internal(format!(
                "instance {:?} already has a wrapped association",
                proxy.id()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(InstanceRecord {
                    proxy: proxy.downgrade(),
                    wrapped,
                    shadow: FxHashMap::default(),
                });
                Ok(())
            }
        }
    }

    /// The wrapped instance a proxy decorates
    pub(crate) fn get_association(&self, proxy: &ObjRef) -> VeneerResult<ObjRef> {
        self.records
            .read()
            .get(&proxy.id())
            .filter(|record| record.is_live())
            .map(|record| record.wrapped.clone())
            .ok_or_else(|| {
                VeneerError::Internal(format!(
                    "no wrapped association for instance {:?}; used before construction or after release",
                    proxy.id()
                ))
            })
    }

    /// Read a proxy's shadow slot for one attribute, if present
    pub(crate) fn shadow_slot(&self, proxy: &ObjRef, name: &str) -> Option<ShadowSlot> {
        self.records
            .read()
            .get(&proxy.id())
            .filter(|record| record.is_live())
            .and_then(|record| record.shadow.get(name).cloned())
    }

    /// Write a proxy's shadow slot for one attribute
    pub(crate) fn write_shadow(
        &self,
        proxy: &ObjRef,
        name: &str,
        slot: ShadowSlot,
    ) -> VeneerResult<()> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&proxy.id())
            .filter(|record| record.is_live())
            .ok_or_else(|| {
                VeneerError::Internal(format!(
                    "no wrapped association for instance {:?}; used before construction or after release",
                    proxy.id()
                ))
            })?;
        record.shadow.insert(name.to_string(), slot);
        Ok(())
    }

    /// Explicitly tear down a proxy's association and shadow state
    ///
    /// Returns true if a record existed.
    pub fn release_association(&self, proxy: &ObjRef) -> bool {
        self.records.write().remove(&proxy.id()).is_some()
    }

    /// Sweep records whose proxy instance has been dropped
    ///
    /// Returns the number of records removed.
    pub fn purge_dead(&self) -> usize {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, record| record.is_live());
        before - records.len()
    }

    /// Number of records, including not-yet-swept dead ones
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the registry holds no records
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassId;

    fn obj() -> ObjRef {
        ObjRef::new(ClassId::new(0))
    }

    #[test]
    fn test_association_lifecycle() {
        let registry = InstanceRegistry::new();
        let proxy = obj();
        let wrapped = obj();

        registry.set_association(&proxy, wrapped.clone()).unwrap();
        assert!(registry.get_association(&proxy).unwrap().same_object(&wrapped));
        assert_eq!(registry.len(), 1);

        assert!(registry.release_association(&proxy));
        assert!(!registry.release_association(&proxy));
        assert!(registry.get_association(&proxy).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_double_registration_rejected() {
        let registry = InstanceRegistry::new();
        let proxy = obj();

        registry.set_association(&proxy, obj()).unwrap();
        let err = registry.set_association(&proxy, obj()).unwrap_err();
        assert!(matches!(err, VeneerError::Internal(_)));
    }

    #[test]
    fn test_identity_keying_not_value_equality() {
        let registry = InstanceRegistry::new();
        let p1 = obj();
        let p2 = obj();
        let w1 = obj();
        let w2 = obj();

        registry.set_association(&p1, w1.clone()).unwrap();
        registry.set_association(&p2, w2.clone()).unwrap();

        assert!(registry.get_association(&p1).unwrap().same_object(&w1));
        assert!(registry.get_association(&p2).unwrap().same_object(&w2));
    }

    #[test]
    fn test_shadow_slots_are_per_instance() {
        let registry = InstanceRegistry::new();
        let p1 = obj();
        let p2 = obj();
        registry.set_association(&p1, obj()).unwrap();
        registry.set_association(&p2, obj()).unwrap();

        registry
            .write_shadow(&p1, "x", ShadowSlot::Value(Value::Int(10)))
            .unwrap();

        assert_eq!(
            registry.shadow_slot(&p1, "x"),
            Some(ShadowSlot::Value(Value::Int(10)))
        );
        assert_eq!(registry.shadow_slot(&p2, "x"), None);

        registry.write_shadow(&p1, "x", ShadowSlot::Tombstone).unwrap();
        assert_eq!(registry.shadow_slot(&p1, "x"), Some(ShadowSlot::Tombstone));
    }

    #[test]
    fn test_shadow_write_without_association_fails() {
        let registry = InstanceRegistry::new();
        let stray = obj();
        let err = registry
            .write_shadow(&stray, "x", ShadowSlot::Tombstone)
            .unwrap_err();
        assert!(matches!(err, VeneerError::Internal(_)));
    }

    #[test]
    fn test_dead_records_are_swept() {
        let registry = InstanceRegistry::new();
        let kept = obj();
        registry.set_association(&kept, obj()).unwrap();

        {
            let dropped = obj();
            registry.set_association(&dropped, obj()).unwrap();
            assert_eq!(registry.len(), 2);
        }

        assert_eq!(registry.purge_dead(), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.get_association(&kept).is_ok());
    }
}
