//! Dynamic values and object instances.
//!
//! Objects are reference-counted handles over a class id and a name-keyed
//! field map. Identity is the allocation address, so two value-equal but
//! distinct objects never collide in identity-keyed registries.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::class::{ClassId, MethodFn};
use crate::error::VeneerResult;
use crate::model::ObjectModel;

/// Identity of an object instance (its allocation address)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjId(usize);

/// Heap data behind an object reference
pub struct ObjectData {
    class: ClassId,
    fields: RwLock<FxHashMap<String, Value>>,
}

/// Reference-counted handle to an object instance
#[derive(Clone)]
pub struct ObjRef(Arc<ObjectData>);

impl ObjRef {
    /// Allocate a fresh instance of `class` with an empty field map
    pub(crate) fn new(class: ClassId) -> Self {
        Self(Arc::new(ObjectData {
            class,
            fields: RwLock::new(FxHashMap::default()),
        }))
    }

    /// Class this object is an instance of
    pub fn class_id(&self) -> ClassId {
        self.0.class
    }

    /// Identity key for this object
    pub fn id(&self) -> ObjId {
        ObjId(Arc::as_ptr(&self.0) as *const () as usize)
    }

    /// Whether two handles point at the same object
    pub fn same_object(&self, other: &ObjRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> Weak<ObjectData> {
        Arc::downgrade(&self.0)
    }

    /// Read an instance field, if set on this object
    pub fn field(&self, name: &str) -> Option<Value> {
        self.0.fields.read().get(name).cloned()
    }

    /// Write an instance field
    pub fn set_field(&self, name: &str, value: Value) {
        self.0.fields.write().insert(name.to_string(), value);
    }

    /// Remove an instance field, returning the previous value if any
    pub fn remove_field(&self, name: &str) -> Option<Value> {
        self.0.fields.write().remove(name)
    }
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjRef")
            .field("class", &self.class_id())
            .field("id", &self.id())
            .finish()
    }
}

/// A method closure bound to a receiver
///
/// Produced by attribute reads of declared methods. Forwarded reads bind
/// the wrapped instance as receiver, with the owning wrapped-chain
/// ancestor as defining class; plain reads bind the object itself.
#[derive(Clone)]
pub struct BoundMethod {
    receiver: ObjRef,
    defining_class: ClassId,
    func: MethodFn,
}

impl BoundMethod {
    pub(crate) fn new(receiver: ObjRef, defining_class: ClassId, func: MethodFn) -> Self {
        Self {
            receiver,
            defining_class,
            func,
        }
    }

    /// The receiver this method is bound to
    pub fn receiver(&self) -> &ObjRef {
        &self.receiver
    }

    /// The class whose member table declared the method
    pub fn defining_class(&self) -> ClassId {
        self.defining_class
    }

    /// Invoke the method with its bound receiver
    pub fn call(&self, model: &ObjectModel, args: &[Value]) -> VeneerResult<Value> {
        (self.func)(model, &self.receiver, args)
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("receiver", &self.receiver.id())
            .field("defining_class", &self.defining_class)
            .finish()
    }
}

impl PartialEq for BoundMethod {
    fn eq(&self, other: &Self) -> bool {
        self.receiver.same_object(&other.receiver)
            && self.defining_class == other.defining_class
            && Arc::ptr_eq(&self.func, &other.func)
    }
}

/// A dynamic runtime value
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Immutable string
    Str(Arc<str>),
    /// Object reference (compared by identity)
    Object(ObjRef),
    /// Method bound to a receiver
    Method(BoundMethod),
}

impl Value {
    /// Build a string value
    pub fn str(s: &str) -> Value {
        Value::Str(Arc::from(s))
    }

    /// Whether this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer content, if any
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric content widened to `f64`, if any
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean content, if any
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// String content, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Object content, if any
    pub fn as_object(&self) -> Option<&ObjRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Bound method content, if any
    pub fn as_method(&self) -> Option<&BoundMethod> {
        match self {
            Value::Method(m) => Some(m),
            _ => None,
        }
    }

    /// Kind of this value, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Object(_) => "object",
            Value::Method(_) => "method",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.same_object(b),
            (Value::Method(a), Value::Method(b)) => a == b,
            _ => false,
        }
    }
}
