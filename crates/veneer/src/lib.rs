//! Veneer: runtime class composition with forwarding proxies.
//!
//! Composing a wrapped class with a proxy class synthesizes a generated
//! class whose instances decorate an existing object: attribute access
//! forwards to the wrapped instance unless the proxy class overrides the
//! name, writes land in a per-instance shadow state that never mutates
//! the wrapped object, and deletes record a tombstone.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let model = ObjectModel::new();
//! let vector2 = model.define_class(
//!     ClassBuilder::new("Vector2").field("x").field("y"), /* .. */
//! )?;
//! let logging = model.define_class(ClassBuilder::new("LoggingVector2") /* .. */)?;
//!
//! let generated = model.compose(vector2, logging)?;
//! let v = model.construct(vector2, &[Value::Int(3), Value::Int(4)])?;
//! let p = model.construct_wrapping(generated, &v, &[Value::Bool(true)])?;
//!
//! model.call_method(&p, "length", &[])?;   // runs against the wrapped v
//! model.set_attr(&p, "x", Value::Int(10))?; // shadow write; v.x unchanged
//! ```
//!
//! All state lives in an explicit [`ObjectModel`]; there are no process
//! globals. Registries are lock-guarded, so a shared reference suffices,
//! though no operation suspends or retries.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod accessor;
pub mod class;
pub mod compose;
pub mod error;
pub mod model;
pub mod registry;
pub mod value;

pub use accessor::ForwardingAccessor;
pub use class::{
    Class, ClassBuilder, ClassId, ClassRegistry, Composition, ConstructorFn, GetterFn, Member,
    MethodFn,
};
pub use compose::DEFAULT_IGNORED_MEMBERS;
pub use error::{VeneerError, VeneerResult};
pub use model::{ObjectModel, Wraps};
pub use registry::{InstanceRegistry, ShadowSlot};
pub use value::{BoundMethod, ObjId, ObjRef, Value};
