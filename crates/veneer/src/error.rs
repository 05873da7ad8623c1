//! Error taxonomy for composition, construction, and attribute access.

/// Errors surfaced by the object model
#[derive(Debug, thiserror::Error)]
pub enum VeneerError {
    /// Construction argument is not an instance of the wrapped class
    #[error("class {class:?} cannot wrap an instance of {actual:?} (expected {wrapped:?})")]
    TypeMismatch {
        /// Name of the generated class being constructed
        class: String,
        /// Name of the wrapped class the generated class expects
        wrapped: String,
        /// Name of the class the argument actually belongs to
        actual: String,
    },

    /// Attribute read of a name that is tombstoned or not present
    #[error("class {class:?} has no attribute {attribute:?}")]
    AttributeMissing {
        /// Name of the class owning the attribute
        class: String,
        /// The attribute name
        attribute: String,
    },

    /// Malformed construction or invocation
    #[error("type error: {0}")]
    TypeError(String),

    /// Class id or name not present in the registry
    #[error("unknown class: {0}")]
    UnknownClass(String),

    /// Operation requires a composed (generated) class
    #[error("class {0:?} is not a composed class")]
    NotComposed(String),

    /// Invariant violation inside the composition machinery; a defect,
    /// never expected in correct usage
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias for object-model operations
pub type VeneerResult<T> = Result<T, VeneerError>;
