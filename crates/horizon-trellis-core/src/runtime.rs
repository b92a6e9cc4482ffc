//! The runtime: explicit owner of every global registry.
//!
//! Rather than scattering statics, all shared lookup tables live on one
//! [`Runtime`] value constructed at setup and passed where needed. A
//! process-global accessor is available for callers that genuinely have
//! no way to thread the runtime through.
//!
//! # Example
//!
//! ```ignore
//! use horizon_trellis_core::runtime::Runtime;
//!
//! let runtime = Runtime::new();
//! runtime.mixins().register(my_mixin);
//! let class = ClassBuilder::new("Widget").build(&runtime)?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::class::{ClassRegistry, Instance};
use crate::error::{Result, TrellisError};
use crate::mixin::MixinRegistry;
use crate::singleton::SingletonRegistry;
use crate::variant::Variant;

/// Builds a typed instance from a raw data node.
pub type ConstructorFn = Arc<dyn Fn(&Variant) -> Result<Arc<Instance>> + Send + Sync>;

/// Registry mapping type tags to instance constructors.
///
/// Classes self-register here from their `init_class` hooks so data
/// hydration can resolve a `type` tag to the right class. Registering a
/// tag twice silently replaces the earlier constructor; entries are never
/// removed.
#[derive(Default)]
pub struct ConstructorRegistry {
    constructors: RwLock<HashMap<String, ConstructorFn>>,
}

impl ConstructorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for `tag`, replacing any previous one.
    pub fn register<F>(&self, tag: impl Into<String>, constructor: F)
    where
        F: Fn(&Variant) -> Result<Arc<Instance>> + Send + Sync + 'static,
    {
        let tag = tag.into();
        let previous = self
            .constructors
            .write()
            .insert(tag.clone(), Arc::new(constructor));
        if previous.is_some() {
            tracing::trace!(
                target: "horizon_trellis_core::runtime",
                tag = %tag,
                "replacing registered constructor"
            );
        }
    }

    /// The constructor for `tag`, if one was registered.
    pub fn get(&self, tag: &str) -> Option<ConstructorFn> {
        self.constructors.read().get(tag).cloned()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.read().contains_key(tag)
    }

    /// Build an instance for `tag` from `data`.
    pub fn construct(&self, tag: &str, data: &Variant) -> Option<Result<Arc<Instance>>> {
        self.get(tag).map(|constructor| constructor(data))
    }

    pub fn len(&self) -> usize {
        self.constructors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.read().is_empty()
    }
}

impl fmt::Debug for ConstructorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorRegistry")
            .field("len", &self.len())
            .finish()
    }
}

/// Owner of the mixin, class, singleton, and constructor registries.
#[derive(Default)]
pub struct Runtime {
    mixins: MixinRegistry,
    classes: ClassRegistry,
    singletons: SingletonRegistry,
    constructors: ConstructorRegistry,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mixins(&self) -> &MixinRegistry {
        &self.mixins
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn singletons(&self) -> &SingletonRegistry {
        &self.singletons
    }

    pub fn constructors(&self) -> &ConstructorRegistry {
        &self.constructors
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("mixins", &self.mixins.len())
            .field("classes", &self.classes.len())
            .field("singletons", &self.singletons.len())
            .field("constructors", &self.constructors.len())
            .finish()
    }
}

static GLOBAL_RUNTIME: OnceLock<Arc<Runtime>> = OnceLock::new();

/// Install the process-global runtime. Fails if one is already set.
pub fn init_global_runtime(runtime: Runtime) -> Result<Arc<Runtime>> {
    let runtime = Arc::new(runtime);
    GLOBAL_RUNTIME
        .set(runtime.clone())
        .map_err(|_| TrellisError::RuntimeAlreadyInitialized)?;
    Ok(runtime)
}

/// The process-global runtime, if one was installed.
pub fn global_runtime() -> Result<Arc<Runtime>> {
    GLOBAL_RUNTIME
        .get()
        .cloned()
        .ok_or(TrellisError::RuntimeNotInitialized)
}
