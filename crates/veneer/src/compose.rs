//! Type composition: forwarding-set computation and generated classes.
//!
//! Composing a wrapped class with a proxy class produces a generated
//! class deriving from the proxy. The generated class's own member table
//! holds exactly one forwarding accessor per forwarded name; every name
//! the proxy chain declares outside the common-ancestor prefix resolves
//! to the proxy's own declaration through ordinary chain lookup, so the
//! proxy always wins on collision.

use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::accessor::ForwardingAccessor;
use crate::class::{ClassId, ClassRegistry, Composition, Member};
use crate::error::{VeneerError, VeneerResult};

/// Member names never forwarded: construction, teardown, and the
/// attribute-hook entry points themselves
pub static DEFAULT_IGNORED_MEMBERS: Lazy<FxHashSet<String>> = Lazy::new(|| {
    ["constructor", "finalize", "get_attr", "set_attr", "del_attr"]
        .iter()
        .map(|name| name.to_string())
        .collect()
});

/// Longest shared leading sequence of two root-to-derived ancestor chains
pub(crate) fn common_ancestor_prefix(
    registry: &ClassRegistry,
    left: ClassId,
    right: ClassId,
) -> Vec<ClassId> {
    registry
        .ancestry(left)
        .iter()
        .zip(registry.ancestry(right).iter())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| *a)
        .collect()
}

/// Names the proxy owns: declared anywhere in its chain outside the
/// common-ancestor prefix, plus the ignored set
fn proxy_owned_names(
    registry: &ClassRegistry,
    proxy: ClassId,
    prefix: &[ClassId],
    ignored: &FxHashSet<String>,
) -> FxHashSet<String> {
    let mut owned: FxHashSet<String> = ignored.iter().cloned().collect();
    for cid in registry.ancestry(proxy) {
        if prefix.contains(&cid) {
            continue;
        }
        if let Some(cls) = registry.get(cid) {
            for name in cls.declared_names() {
                owned.insert(name.to_string());
            }
        }
    }
    owned
}

/// Forwarding bindings: each forwarded name mapped to the most-derived
/// wrapped-chain ancestor declaring it
///
/// Walks the wrapped chain root-to-derived so later (more derived)
/// declarations overwrite earlier ones. Declarations inside the
/// common-ancestor prefix are skipped; those members are already
/// structurally present in the proxy chain.
fn forwarding_bindings(
    registry: &ClassRegistry,
    wrapped: ClassId,
    prefix: &[ClassId],
    owned: &FxHashSet<String>,
) -> FxHashMap<String, ClassId> {
    let mut bindings = FxHashMap::default();
    for cid in registry.ancestry(wrapped) {
        if prefix.contains(&cid) {
            continue;
        }
        let Some(cls) = registry.get(cid) else {
            continue;
        };
        for name in cls.declared_names() {
            if owned.contains(name) {
                continue;
            }
            bindings.insert(name.to_string(), cid);
        }
    }
    bindings
}

/// Build and register the generated class for `(wrapped, proxy)`
pub(crate) fn build_generated(
    registry: &mut ClassRegistry,
    wrapped: ClassId,
    proxy: ClassId,
    ignored: &FxHashSet<String>,
) -> VeneerResult<ClassId> {
    let wrapped_name = registry
        .get(wrapped)
        .map(|cls| cls.name().to_string())
        .ok_or_else(|| VeneerError::UnknownClass(format!("#{}", wrapped.index())))?;
    let proxy_name = registry
        .get(proxy)
        .map(|cls| cls.name().to_string())
        .ok_or_else(|| VeneerError::UnknownClass(format!("#{}", proxy.index())))?;

    let prefix = common_ancestor_prefix(registry, wrapped, proxy);
    let owned = proxy_owned_names(registry, proxy, &prefix, ignored);
    let bindings = forwarding_bindings(registry, wrapped, &prefix, &owned);

    let mut members = FxHashMap::default();
    for (name, owner) in bindings {
        members.insert(
            name.clone(),
            Member::Forward(ForwardingAccessor::new(name, owner)),
        );
    }

    let name = format!("{}[{}]", proxy_name, wrapped_name);
    Ok(registry.insert_generated(name, proxy, members, Composition { wrapped, proxy }))
}
