//! Per-class unique instance registries.
//!
//! A class that wants "one instance per id" semantics owns an
//! [`InstanceRegistry`]. Registration derives an id from the instance when
//! the caller does not supply one (by default the `id` state property),
//! refuses to bind an id that already points at a *different* instance,
//! and is idempotent for re-registering the same instance.
//!
//! Subclasses get independent registries unless they are constructed with
//! [`InstanceRegistry::shared_with`], which joins the parent's backing
//! store.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::class::Instance;
use crate::error::{RegistryError, Result};
use crate::member::{MemberTable, MethodReturn};
use crate::ordered_map::OrderedMap;
use crate::variant::Variant;

/// Derives a registry id from an instance.
pub type KeyDeriveFn = Arc<dyn Fn(&Arc<Instance>) -> Option<String> + Send + Sync>;

struct RegistryInner {
    instances: Mutex<OrderedMap<Arc<Instance>>>,
}

/// Registry mapping ids to unique instances.
#[derive(Clone)]
pub struct InstanceRegistry {
    inner: Arc<RegistryInner>,
    derive_key: KeyDeriveFn,
}

impl InstanceRegistry {
    /// A registry keyed by the `id` state property.
    pub fn new() -> Self {
        Self::with_key_fn(|instance| instance.get("id").as_key())
    }

    /// A registry with a custom id derivation.
    pub fn with_key_fn<F>(derive_key: F) -> Self
    where
        F: Fn(&Arc<Instance>) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(RegistryInner {
                instances: Mutex::new(OrderedMap::new()),
            }),
            derive_key: Arc::new(derive_key),
        }
    }

    /// A view sharing `parent`'s backing store.
    ///
    /// Subclass registries use this when the whole hierarchy should share
    /// one id space.
    pub fn shared_with(parent: &InstanceRegistry) -> Self {
        Self {
            inner: parent.inner.clone(),
            derive_key: parent.derive_key.clone(),
        }
    }

    /// Register `instance` under `id`, deriving the id when omitted.
    ///
    /// Errors when no id can be derived, or when the id is already bound
    /// to a different instance. Re-registering the same instance under
    /// the same id is a no-op.
    pub fn register(&self, instance: &Arc<Instance>, id: Option<&str>) -> Result<String> {
        let id = match id {
            Some(id) => id.to_string(),
            None => (self.derive_key)(instance).ok_or(RegistryError::MissingInstanceId)?,
        };

        let mut instances = self.inner.instances.lock();
        if let Some(existing) = instances.get(&id) {
            if Arc::ptr_eq(existing, instance) {
                return Ok(id);
            }
            return Err(RegistryError::DuplicateInstanceId(id).into());
        }
        instances.insert(&id, instance.clone());
        Ok(id)
    }

    /// Remove the instance bound to `id`, if any.
    pub fn unregister(&self, id: &str) -> Option<Arc<Instance>> {
        self.inner.instances.lock().remove(id)
    }

    /// The instance bound to `id`.
    pub fn get(&self, id: &str) -> Option<Arc<Instance>> {
        self.inner.instances.lock().get(id).cloned()
    }

    /// A shallow snapshot of the whole registry, in registration order.
    pub fn get_all(&self) -> OrderedMap<Arc<Instance>> {
        self.inner.instances.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.instances.lock().is_empty()
    }

    /// Visit every `(instance, id)` pair in registration order.
    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&Arc<Instance>, &str),
    {
        self.get_all().for_each(f);
    }

    /// Map every instance through `f`, in registration order.
    pub fn map<F, R>(&self, mut f: F) -> Vec<R>
    where
        F: FnMut(&Arc<Instance>, &str) -> R,
    {
        let mut out = Vec::new();
        self.for_each(|instance, id| out.push(f(instance, id)));
        out
    }

    /// Keep the instances for which `f` returns true.
    pub fn filter<F>(&self, mut f: F) -> Vec<Arc<Instance>>
    where
        F: FnMut(&Arc<Instance>, &str) -> bool,
    {
        let mut out = Vec::new();
        self.for_each(|instance, id| {
            if f(instance, id) {
                out.push(instance.clone());
            }
        });
        out
    }

    /// Members exposing registration to instances of the owning class.
    ///
    /// `register` takes an optional id argument (derived when absent) and
    /// returns the id; `unregister` takes the id and returns whether an
    /// entry was removed.
    pub fn member_table(&self) -> MemberTable {
        let register_registry = self.clone();
        let unregister_registry = self.clone();
        MemberTable::new()
            .with_method("register", move |instance, args| {
                let id = args.first().and_then(Variant::as_key);
                let id = register_registry.register(instance, id.as_deref())?;
                MethodReturn::value(id)
            })
            .with_method("unregister", move |_instance, args| {
                let removed = args
                    .first()
                    .and_then(Variant::as_key)
                    .map(|id| unregister_registry.unregister(&id).is_some())
                    .unwrap_or(false);
                MethodReturn::value(removed)
            })
    }
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("len", &self.len())
            .finish()
    }
}
