//! The object model: class registry, instance registry, composition
//! cache, and the public attribute surface.
//!
//! The model is an explicit, injectable object rather than process-wide
//! state. Its registries are lock-guarded internally, so a shared
//! reference is enough for every operation.

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::class::{Class, ClassBuilder, ClassId, ClassRegistry, Member};
use crate::compose::{self, DEFAULT_IGNORED_MEMBERS};
use crate::error::{VeneerError, VeneerResult};
use crate::registry::InstanceRegistry;
use crate::value::{BoundMethod, ObjRef, Value};

/// Class definitions, proxy associations, and composition entry points
#[derive(Default)]
pub struct ObjectModel {
    classes: RwLock<ClassRegistry>,
    instances: InstanceRegistry,
    composed: RwLock<FxHashMap<(ClassId, ClassId), ClassId>>,
}

impl ObjectModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Class surface
    // ========================================================================

    /// Register a class declaration
    pub fn define_class(&self, builder: ClassBuilder) -> VeneerResult<ClassId> {
        self.classes.write().define(builder)
    }

    /// Look up a class id by name
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.classes.read().get_by_name(name).map(|cls| cls.id())
    }

    /// Run `f` against a class definition
    ///
    /// `f` must not call back into the model; the class registry stays
    /// read-locked for the duration of the call.
    pub fn with_class<R>(&self, class: ClassId, f: impl FnOnce(&Class) -> R) -> VeneerResult<R> {
        let classes = self.classes.read();
        let cls = classes
            .get(class)
            .ok_or_else(|| VeneerError::UnknownClass(format!("#{}", class.index())))?;
        Ok(f(cls))
    }

    /// Linearized ancestor chain in root-to-derived order
    pub fn ancestry(&self, class: ClassId) -> VeneerResult<Vec<ClassId>> {
        let classes = self.classes.read();
        if classes.get(class).is_none() {
            return Err(VeneerError::UnknownClass(format!("#{}", class.index())));
        }
        Ok(classes.ancestry(class))
    }

    /// Sorted forwarding-name set of a generated class
    pub fn forwarded_names(&self, class: ClassId) -> VeneerResult<Vec<String>> {
        self.with_class(class, |cls| cls.forwarded_names())
    }

    /// Whether `obj` is an instance of `class`, directly or by inheritance
    pub fn is_instance_of(&self, obj: &ObjRef, class: ClassId) -> bool {
        self.classes.read().is_subclass_of(obj.class_id(), class)
    }

    /// Display label for a class, tolerating unknown ids
    pub(crate) fn class_label(&self, class: ClassId) -> String {
        self.classes
            .read()
            .get(class)
            .map(|cls| cls.name().to_string())
            .unwrap_or_else(|| format!("#{}", class.index()))
    }

    /// Member declared directly on `class`, bypassing chain resolution
    pub(crate) fn declared_member(&self, class: ClassId, name: &str) -> Option<Member> {
        self.classes
            .read()
            .get(class)
            .and_then(|cls| cls.declared(name).cloned())
    }

    /// The instance registry backing proxy associations
    pub fn instances(&self) -> &InstanceRegistry {
        &self.instances
    }

    // ========================================================================
    // Composition
    // ========================================================================

    /// Compose `wrapped` and `proxy` into a generated class
    ///
    /// Memoized per pair: repeated calls return the identical class id.
    pub fn compose(&self, wrapped: ClassId, proxy: ClassId) -> VeneerResult<ClassId> {
        let mut cache = self.composed.write();
        if let Some(id) = cache.get(&(wrapped, proxy)) {
            return Ok(*id);
        }

        let id = {
            let mut classes = self.classes.write();
            compose::build_generated(&mut classes, wrapped, proxy, &DEFAULT_IGNORED_MEMBERS)?
        };
        cache.insert((wrapped, proxy), id);
        Ok(id)
    }

    /// Compose with a custom ignored-name set
    ///
    /// Bypasses the pair cache; callers supplying a non-default ignored
    /// set are responsible for caching the result.
    pub fn compose_with_ignored(
        &self,
        wrapped: ClassId,
        proxy: ClassId,
        ignored: &FxHashSet<String>,
    ) -> VeneerResult<ClassId> {
        let mut classes = self.classes.write();
        compose::build_generated(&mut classes, wrapped, proxy, ignored)
    }

    /// Decorator-style sugar over [`ObjectModel::compose`]
    pub fn wraps(&self, wrapped: ClassId) -> Wraps<'_> {
        Wraps {
            model: self,
            wrapped,
        }
    }

    // ========================================================================
    // Construction and lifecycle
    // ========================================================================

    /// Construct an instance of a plain (non-composed) class
    pub fn construct(&self, class: ClassId, args: &[Value]) -> VeneerResult<ObjRef> {
        let (is_composed, ctor) = {
            let classes = self.classes.read();
            let cls = classes
                .get(class)
                .ok_or_else(|| VeneerError::UnknownClass(format!("#{}", class.index())))?;
            (cls.is_composed(), classes.resolve_constructor(class))
        };

        if is_composed {
            return Err(VeneerError::TypeError(format!(
                "composed class {:?} must be constructed with construct_wrapping",
                self.class_label(class)
            )));
        }

        let obj = ObjRef::new(class);
        match ctor {
            Some(ctor) => ctor(self, &obj, args)?,
            None if !args.is_empty() => {
                return Err(VeneerError::TypeError(format!(
                    "class {:?} takes no constructor arguments ({} given)",
                    self.class_label(class),
                    args.len()
                )));
            }
            None => {}
        }
        Ok(obj)
    }

    /// Construct an instance of a generated class around `wrapped_obj`
    ///
    /// Validates the wrapped instance, registers the association with an
    /// empty shadow state, then runs the proxy chain's constructor with
    /// `args`. A constructor failure rolls the association back, so no
    /// residual registration survives a failed construction.
    pub fn construct_wrapping(
        &self,
        generated: ClassId,
        wrapped_obj: &ObjRef,
        args: &[Value],
    ) -> VeneerResult<ObjRef> {
        let composition = self.with_class(generated, |cls| cls.composition())?;
        let Some(composition) = composition else {
            return Err(VeneerError::NotComposed(self.class_label(generated)));
        };

        if !self.is_instance_of(wrapped_obj, composition.wrapped) {
            return Err(VeneerError::TypeMismatch {
                class: self.class_label(generated),
                wrapped: self.class_label(composition.wrapped),
                actual: self.class_label(wrapped_obj.class_id()),
            });
        }

        let proxy = ObjRef::new(generated);
        self.instances.set_association(&proxy, wrapped_obj.clone())?;

        // Nearest constructor along the proxy chain; the generated class
        // itself declares none.
        let ctor = self.classes.read().resolve_constructor(composition.proxy);
        let outcome = match ctor {
            Some(ctor) => ctor(self, &proxy, args),
            None if !args.is_empty() => Err(VeneerError::TypeError(format!(
                "class {:?} takes no constructor arguments ({} given)",
                self.class_label(composition.proxy),
                args.len()
            ))),
            None => Ok(()),
        };
        if let Err(err) = outcome {
            self.instances.release_association(&proxy);
            return Err(err);
        }

        Ok(proxy)
    }

    /// The wrapped instance a proxy decorates
    pub fn get_wrapped(&self, proxy: &ObjRef) -> VeneerResult<ObjRef> {
        self.instances.get_association(proxy)
    }

    /// Explicitly tear down a proxy's association and shadow state
    pub fn release(&self, proxy: &ObjRef) -> bool {
        self.instances.release_association(proxy)
    }

    // ========================================================================
    // Attribute surface
    // ========================================================================

    /// Read an attribute
    pub fn get_attr(&self, obj: &ObjRef, name: &str) -> VeneerResult<Value> {
        let resolved = self.classes.read().resolve_member(obj.class_id(), name);
        match resolved {
            Some((_, Member::Forward(accessor))) => accessor.get(self, obj),
            Some((owner, member)) => {
                // Instance entries shadow declared members.
                if let Some(value) = obj.field(name) {
                    return Ok(value);
                }
                match member {
                    Member::Field { default } => default.ok_or_else(|| {
                        VeneerError::AttributeMissing {
                            class: self.class_label(owner),
                            attribute: name.to_string(),
                        }
                    }),
                    Member::Method(func) => {
                        Ok(Value::Method(BoundMethod::new(obj.clone(), owner, func)))
                    }
                    Member::Getter(getter) => getter(self, obj),
                    Member::Forward(_) => unreachable!("handled above"),
                }
            }
            None => obj.field(name).ok_or_else(|| VeneerError::AttributeMissing {
                class: self.class_label(obj.class_id()),
                attribute: name.to_string(),
            }),
        }
    }

    /// Write an attribute
    ///
    /// Forwarded names shadow-write into the proxy's shadow state; any
    /// other name writes the instance field map.
    pub fn set_attr(&self, obj: &ObjRef, name: &str, value: Value) -> VeneerResult<()> {
        let resolved = self.classes.read().resolve_member(obj.class_id(), name);
        match resolved {
            Some((_, Member::Forward(accessor))) => accessor.set(self, obj, value),
            _ => {
                obj.set_field(name, value);
                Ok(())
            }
        }
    }

    /// Delete an attribute
    ///
    /// Forwarded names record a tombstone; the binding remains and the
    /// value is unreadable until overwritten. Other names remove the
    /// instance field map entry.
    pub fn del_attr(&self, obj: &ObjRef, name: &str) -> VeneerResult<()> {
        let resolved = self.classes.read().resolve_member(obj.class_id(), name);
        match resolved {
            Some((_, Member::Forward(accessor))) => accessor.delete(self, obj),
            _ => match obj.remove_field(name) {
                Some(_) => Ok(()),
                None => Err(VeneerError::AttributeMissing {
                    class: self.class_label(obj.class_id()),
                    attribute: name.to_string(),
                }),
            },
        }
    }

    /// Read an attribute and invoke it as a method
    pub fn call_method(&self, obj: &ObjRef, name: &str, args: &[Value]) -> VeneerResult<Value> {
        match self.get_attr(obj, name)? {
            Value::Method(method) => method.call(self, args),
            other => Err(VeneerError::TypeError(format!(
                "attribute {:?} of {:?} is not callable (got {})",
                name,
                self.class_label(obj.class_id()),
                other.type_name()
            ))),
        }
    }
}

/// Decorator-style composition handle returned by [`ObjectModel::wraps`]
pub struct Wraps<'a> {
    model: &'a ObjectModel,
    wrapped: ClassId,
}

impl Wraps<'_> {
    /// Apply to a proxy class, yielding the generated class
    pub fn apply(&self, proxy: ClassId) -> VeneerResult<ClassId> {
        self.model.compose(self.wrapped, proxy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construct_runs_constructor() {
        let model = ObjectModel::new();
        let point = model
            .define_class(ClassBuilder::new("Point").field("x").constructor(
                |model, this, args| {
                    model.set_attr(this, "x", args[0].clone())?;
                    Ok(())
                },
            ))
            .unwrap();

        let obj = model.construct(point, &[Value::Int(7)]).unwrap();
        assert_eq!(model.get_attr(&obj, "x").unwrap(), Value::Int(7));
    }

    #[test]
    fn test_construct_without_constructor_rejects_args() {
        let model = ObjectModel::new();
        let plain = model.define_class(ClassBuilder::new("Plain")).unwrap();

        assert!(model.construct(plain, &[]).is_ok());
        let err = model.construct(plain, &[Value::Int(1)]).unwrap_err();
        assert!(matches!(err, VeneerError::TypeError(_)));
    }

    #[test]
    fn test_field_default_and_instance_shadowing() {
        let model = ObjectModel::new();
        let cfg = model
            .define_class(
                ClassBuilder::new("Config").field_with_default("level", Value::Int(0)),
            )
            .unwrap();

        let obj = model.construct(cfg, &[]).unwrap();
        assert_eq!(model.get_attr(&obj, "level").unwrap(), Value::Int(0));

        model.set_attr(&obj, "level", Value::Int(3)).unwrap();
        assert_eq!(model.get_attr(&obj, "level").unwrap(), Value::Int(3));

        // Deleting the instance entry re-exposes the class default.
        model.del_attr(&obj, "level").unwrap();
        assert_eq!(model.get_attr(&obj, "level").unwrap(), Value::Int(0));
    }

    #[test]
    fn test_unknown_attribute() {
        let model = ObjectModel::new();
        let plain = model.define_class(ClassBuilder::new("Plain")).unwrap();
        let obj = model.construct(plain, &[]).unwrap();

        let err = model.get_attr(&obj, "ghost").unwrap_err();
        assert!(matches!(err, VeneerError::AttributeMissing { .. }));
        let err = model.del_attr(&obj, "ghost").unwrap_err();
        assert!(matches!(err, VeneerError::AttributeMissing { .. }));

        // Writes create instance entries even for undeclared names.
        model.set_attr(&obj, "ghost", Value::Bool(true)).unwrap();
        assert_eq!(model.get_attr(&obj, "ghost").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_getter_runs_with_receiver() {
        let model = ObjectModel::new();
        let cls = model
            .define_class(
                ClassBuilder::new("Named")
                    .field_with_default("name", Value::str("anon"))
                    .getter("label", |model, this| {
                        let name = model.get_attr(this, "name")?;
                        Ok(Value::str(&format!(
                            "<{}>",
                            name.as_str().unwrap_or_default()
                        )))
                    }),
            )
            .unwrap();

        let obj = model.construct(cls, &[]).unwrap();
        assert_eq!(model.get_attr(&obj, "label").unwrap(), Value::str("<anon>"));

        model.set_attr(&obj, "name", Value::str("core")).unwrap();
        assert_eq!(model.get_attr(&obj, "label").unwrap(), Value::str("<core>"));
    }

    #[test]
    fn test_call_method_rejects_non_callable() {
        let model = ObjectModel::new();
        let cls = model
            .define_class(ClassBuilder::new("Holder").field_with_default("x", Value::Int(1)))
            .unwrap();
        let obj = model.construct(cls, &[]).unwrap();

        let err = model.call_method(&obj, "x", &[]).unwrap_err();
        assert!(matches!(err, VeneerError::TypeError(_)));
    }

    #[test]
    fn test_methods_bind_their_receiver() {
        let model = ObjectModel::new();
        let cls = model
            .define_class(
                ClassBuilder::new("Counter")
                    .field_with_default("n", Value::Int(0))
                    .method("bump", |model, this, _| {
                        let n = model.get_attr(this, "n")?.as_i64().unwrap_or(0);
                        model.set_attr(this, "n", Value::Int(n + 1))?;
                        model.get_attr(this, "n")
                    }),
            )
            .unwrap();

        let a = model.construct(cls, &[]).unwrap();
        let b = model.construct(cls, &[]).unwrap();

        assert_eq!(model.call_method(&a, "bump", &[]).unwrap(), Value::Int(1));
        assert_eq!(model.call_method(&a, "bump", &[]).unwrap(), Value::Int(2));
        assert_eq!(model.call_method(&b, "bump", &[]).unwrap(), Value::Int(1));
    }
}
