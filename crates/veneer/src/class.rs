//! Class descriptors, member tables, and the class registry.
//!
//! Classes are runtime descriptors with single inheritance. The parent
//! chain gives each class a deterministic linearized ancestor chain
//! (root-to-derived), which member resolution walks derived-to-root.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::accessor::ForwardingAccessor;
use crate::error::{VeneerError, VeneerResult};
use crate::model::ObjectModel;
use crate::value::{ObjRef, Value};

/// Unique identifier for a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(usize);

impl ClassId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of this class in the registry
    pub fn index(self) -> usize {
        self.0
    }
}

/// Native method implementation: `(model, receiver, args) -> value`
pub type MethodFn = Arc<dyn Fn(&ObjectModel, &ObjRef, &[Value]) -> VeneerResult<Value> + Send + Sync>;

/// Computed property implementation: `(model, receiver) -> value`
pub type GetterFn = Arc<dyn Fn(&ObjectModel, &ObjRef) -> VeneerResult<Value> + Send + Sync>;

/// Constructor implementation: `(model, instance, args)`
pub type ConstructorFn = Arc<dyn Fn(&ObjectModel, &ObjRef, &[Value]) -> VeneerResult<()> + Send + Sync>;

/// A member declared directly on a class
#[derive(Clone)]
pub enum Member {
    /// Data field, optionally with a class-level default value
    Field {
        /// Value reads fall back to when the instance has no own entry
        default: Option<Value>,
    },
    /// Native method; reads produce a [`crate::value::BoundMethod`]
    Method(MethodFn),
    /// Computed property; reads invoke the getter with the receiver
    Getter(GetterFn),
    /// Forwarding accessor; present only on generated classes
    Forward(ForwardingAccessor),
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Field { default } => f.debug_struct("Field").field("default", default).finish(),
            Member::Method(_) => f.write_str("Method(..)"),
            Member::Getter(_) => f.write_str("Getter(..)"),
            Member::Forward(acc) => f.debug_tuple("Forward").field(acc).finish(),
        }
    }
}

/// Marker recorded on generated classes: which pair produced them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Composition {
    /// Class whose instances the generated class wraps
    pub wrapped: ClassId,
    /// Proxy class the generated class derives from
    pub proxy: ClassId,
}

/// A class definition
pub struct Class {
    id: ClassId,
    name: String,
    parent: Option<ClassId>,
    members: FxHashMap<String, Member>,
    constructor: Option<ConstructorFn>,
    composition: Option<Composition>,
}

impl Class {
    /// Class id
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent class, if any
    pub fn parent(&self) -> Option<ClassId> {
        self.parent
    }

    /// Composition marker, present only on generated classes
    pub fn composition(&self) -> Option<Composition> {
        self.composition
    }

    /// Whether this class was produced by composition
    pub fn is_composed(&self) -> bool {
        self.composition.is_some()
    }

    /// Member declared directly on this class (no chain walk)
    pub fn declared(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    /// Names declared directly on this class
    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(|s| s.as_str())
    }

    /// Constructor declared directly on this class
    pub(crate) fn own_constructor(&self) -> Option<ConstructorFn> {
        self.constructor.clone()
    }

    /// Sorted names of this class's forwarding accessors
    ///
    /// Empty for non-generated classes. Sorted so that two generated
    /// classes can be compared for an identical forwarding set.
    pub fn forwarded_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .members
            .iter()
            .filter(|(_, m)| matches!(m, Member::Forward(_)))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.declared_names().collect();
        names.sort();
        f.debug_struct("Class")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("members", &names)
            .field("composition", &self.composition)
            .finish()
    }
}

/// Builder for declaring a class
pub struct ClassBuilder {
    name: String,
    parent: Option<ClassId>,
    members: FxHashMap<String, Member>,
    constructor: Option<ConstructorFn>,
}

impl ClassBuilder {
    /// Start a class declaration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            members: FxHashMap::default(),
            constructor: None,
        }
    }

    /// Set the parent class
    pub fn extends(mut self, parent: ClassId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Declare a data field with no default
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.members.insert(name.into(), Member::Field { default: None });
        self
    }

    /// Declare a data field with a class-level default value
    pub fn field_with_default(mut self, name: impl Into<String>, default: Value) -> Self {
        self.members.insert(
            name.into(),
            Member::Field {
                default: Some(default),
            },
        );
        self
    }

    /// Declare a native method
    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ObjectModel, &ObjRef, &[Value]) -> VeneerResult<Value> + Send + Sync + 'static,
    {
        self.members.insert(name.into(), Member::Method(Arc::new(f)));
        self
    }

    /// Declare a computed property
    pub fn getter<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ObjectModel, &ObjRef) -> VeneerResult<Value> + Send + Sync + 'static,
    {
        self.members.insert(name.into(), Member::Getter(Arc::new(f)));
        self
    }

    /// Declare the class constructor
    pub fn constructor<F>(mut self, f: F) -> Self
    where
        F: Fn(&ObjectModel, &ObjRef, &[Value]) -> VeneerResult<()> + Send + Sync + 'static,
    {
        self.constructor = Some(Arc::new(f));
        self
    }
}

/// Registry of class definitions
#[derive(Debug, Default)]
pub struct ClassRegistry {
    /// Classes indexed by id
    classes: Vec<Class>,
    /// Class name to id mapping
    name_to_id: FxHashMap<String, ClassId>,
}

impl ClassRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class declaration
    pub fn define(&mut self, builder: ClassBuilder) -> VeneerResult<ClassId> {
        if let Some(parent) = builder.parent {
            if self.get(parent).is_none() {
                return Err(VeneerError::UnknownClass(format!("#{}", parent.index())));
            }
        }

        let id = ClassId(self.classes.len());
        self.name_to_id.insert(builder.name.clone(), id);
        self.classes.push(Class {
            id,
            name: builder.name,
            parent: builder.parent,
            members: builder.members,
            constructor: builder.constructor,
            composition: None,
        });
        Ok(id)
    }

    /// Register a generated class produced by composition
    pub(crate) fn insert_generated(
        &mut self,
        name: String,
        parent: ClassId,
        members: FxHashMap<String, Member>,
        composition: Composition,
    ) -> ClassId {
        let id = ClassId(self.classes.len());
        self.name_to_id.insert(name.clone(), id);
        self.classes.push(Class {
            id,
            name,
            parent: Some(parent),
            members,
            constructor: None,
            composition: Some(composition),
        });
        id
    }

    /// Get class by id
    pub fn get(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(id.index())
    }

    /// Get class by name
    pub fn get_by_name(&self, name: &str) -> Option<&Class> {
        self.name_to_id.get(name).and_then(|id| self.get(*id))
    }

    /// Linearized ancestor chain in root-to-derived order
    ///
    /// Empty if `id` is not registered.
    pub fn ancestry(&self, id: ClassId) -> Vec<ClassId> {
        if self.get(id).is_none() {
            return Vec::new();
        }

        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(cid) = current {
            chain.push(cid);
            current = self.get(cid).and_then(|cls| cls.parent());
        }
        chain.reverse();
        chain
    }

    /// Check an inheritance relationship (a class is a subclass of itself)
    pub fn is_subclass_of(&self, sub: ClassId, sup: ClassId) -> bool {
        let mut current = Some(sub);
        while let Some(cid) = current {
            if cid == sup {
                return true;
            }
            current = self.get(cid).and_then(|cls| cls.parent());
        }
        false
    }

    /// Resolve a member along the chain, most-derived declaration first
    ///
    /// Returns the declaring class together with the member.
    pub fn resolve_member(&self, id: ClassId, name: &str) -> Option<(ClassId, Member)> {
        let mut current = Some(id);
        while let Some(cid) = current {
            let cls = self.get(cid)?;
            if let Some(member) = cls.declared(name) {
                return Some((cid, member.clone()));
            }
            current = cls.parent();
        }
        None
    }

    /// Resolve the nearest constructor along the chain
    pub fn resolve_constructor(&self, id: ClassId) -> Option<ConstructorFn> {
        let mut current = Some(id);
        while let Some(cid) = current {
            let cls = self.get(cid)?;
            if let Some(ctor) = cls.own_constructor() {
                return Some(ctor);
            }
            current = cls.parent();
        }
        None
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
