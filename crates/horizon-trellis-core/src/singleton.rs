//! Named singleton instances.
//!
//! A singleton is a one-off instance built from a mixin list plus its own
//! members, without a separately declared class. The registry builds an
//! anonymous class named after the singleton, creates the instance, runs
//! its `init` method exactly once, and registers it under the global
//! name.
//!
//! Re-creating a name silently replaces the previous entry. That is
//! deliberately looser than [`InstanceRegistry`](crate::uniquify), which
//! refuses duplicate ids.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::class::{ClassBuilder, Instance};
use crate::error::{RegistryError, Result};
use crate::member::MemberTable;
use crate::mixin::MixinSpec;
use crate::runtime::Runtime;

/// Declaration of a singleton: mixins first, own members on top.
pub struct SingletonDef {
    name: String,
    mixins: Vec<MixinSpec>,
    members: MemberTable,
}

impl SingletonDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mixins: Vec::new(),
            members: MemberTable::new(),
        }
    }

    /// Apply mixins; may be called repeatedly, order is preserved.
    pub fn mixin(mut self, spec: impl Into<MixinSpec>) -> Self {
        self.mixins.push(spec.into());
        self
    }

    /// The singleton's own members (highest precedence).
    pub fn members(mut self, members: MemberTable) -> Self {
        self.members = members;
        self
    }
}

/// Registry of named singleton instances.
#[derive(Default)]
pub struct SingletonRegistry {
    singletons: RwLock<HashMap<String, Arc<Instance>>>,
}

impl SingletonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and register a singleton from its declaration.
    ///
    /// The backing class registers under the singleton's name, `init`
    /// runs once if declared, and any previous instance under the name is
    /// silently replaced.
    pub fn create(&self, runtime: &Runtime, def: SingletonDef) -> Result<Arc<Instance>> {
        let mut builder = ClassBuilder::new(def.name.clone());
        for spec in def.mixins {
            builder = builder.mixin(spec);
        }
        let class = builder.members(def.members).build(runtime)?;

        let instance = Instance::create(class);
        instance.mark_singleton();
        instance.call_if_present("init", &[])?;

        let previous = self
            .singletons
            .write()
            .insert(def.name.clone(), instance.clone());
        if previous.is_some() {
            tracing::trace!(
                target: "horizon_trellis_core::singleton",
                name = %def.name,
                "replacing registered singleton"
            );
        }
        Ok(instance)
    }

    /// Look up a singleton by name.
    pub fn get(&self, name: &str) -> Option<Arc<Instance>> {
        self.singletons.read().get(name).cloned()
    }

    /// Look up a singleton, failing when it was never created.
    pub fn require(&self, name: &str) -> Result<Arc<Instance>> {
        self.get(name)
            .ok_or_else(|| RegistryError::UnknownSingleton(name.to_string()).into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.singletons.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.singletons.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.singletons.read().is_empty()
    }
}

impl fmt::Debug for SingletonRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonRegistry")
            .field("len", &self.len())
            .finish()
    }
}
