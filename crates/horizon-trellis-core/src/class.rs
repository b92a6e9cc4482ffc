//! Classes and dynamic instances.
//!
//! A [`Class`] is built once from an optional superclass, an ordered list
//! of mixins, and its own members; the merge happens at build time so
//! instance dispatch is a single table lookup. Precedence, most specific
//! first: own members, later mixins, earlier mixins, superclass.
//!
//! An [`Instance`] is a ref-counted dynamic object: a state bag seeded
//! from the class's data members, a keyed debounce scheduler, and a bound
//! method cache. Instances are always handled as `Arc<Instance>` because
//! method slots and the scheduler hold weak references back to their
//! owner.
//!
//! # Example
//!
//! ```ignore
//! use horizon_trellis_core::class::ClassBuilder;
//! use horizon_trellis_core::member::{MemberTable, MethodReturn};
//!
//! let class = ClassBuilder::new("TodoItem")
//!     .members(
//!         MemberTable::new()
//!             .with_data("title", "")
//!             .with_method("reset", |instance, _args| {
//!                 instance.set("title", "");
//!                 MethodReturn::nothing()
//!             }),
//!     )
//!     .build(&runtime)?;
//! let item = Instance::create(class);
//! item.call("reset", &[])?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::bind::{BoundCache, BoundMethod, BoundSoon};
use crate::error::{ClassError, Result, TrellisError};
use crate::member::{Member, MemberTable, MethodReturn};
use crate::mixin::MixinSpec;
use crate::ordered_map::OrderedMap;
use crate::runtime::Runtime;
use crate::signal::Signal;
use crate::soon::{SoonDispatch, SoonError, SoonHandle, SoonScheduler};
use crate::variant::Variant;

/// One link in a class's ancestor chain, most specific first.
pub enum ProtoLink {
    /// A mixin applied at build time, with a snapshot of the members it
    /// contributed.
    Mixin { name: String, members: MemberTable },
    /// The superclass; lookup recurses into its own chain.
    Superclass(Arc<Class>),
}

impl ProtoLink {
    fn matches(&self, ancestor: &str) -> bool {
        match self {
            Self::Mixin { name, .. } => name == ancestor,
            Self::Superclass(class) => class.name() == ancestor,
        }
    }
}

impl fmt::Debug for ProtoLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mixin { name, .. } => f.debug_tuple("Mixin").field(name).finish(),
            Self::Superclass(class) => f.debug_tuple("Superclass").field(&class.name()).finish(),
        }
    }
}

/// A built class: merged member table plus ancestry metadata.
pub struct Class {
    name: String,
    superclass: Option<Arc<Class>>,
    mixin_names: Vec<String>,
    members: MemberTable,
    own_members: MemberTable,
    statics: MemberTable,
    proto_chain: Vec<ProtoLink>,
}

impl Class {
    /// The class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The superclass, if any.
    pub fn superclass(&self) -> Option<&Arc<Class>> {
        self.superclass.as_ref()
    }

    /// Names of the mixins that were applied, in application order.
    pub fn mixin_names(&self) -> &[String] {
        &self.mixin_names
    }

    /// The fully merged member table instances dispatch through.
    pub fn members(&self) -> &MemberTable {
        &self.members
    }

    /// Only the members this class declared itself.
    pub fn own_members(&self) -> &MemberTable {
        &self.own_members
    }

    /// Class-level (static) members.
    pub fn statics(&self) -> &MemberTable {
        &self.statics
    }

    /// The ancestor chain, most specific first.
    pub fn proto_chain(&self) -> &[ProtoLink] {
        &self.proto_chain
    }

    /// Whether `ancestor` names this class, one of its mixins, or any
    /// transitive superclass or superclass mixin.
    pub fn has_ancestor(&self, ancestor: &str) -> bool {
        if self.name == ancestor {
            return true;
        }
        self.proto_chain.iter().any(|link| match link {
            ProtoLink::Mixin { name, .. } => name == ancestor,
            ProtoLink::Superclass(class) => class.has_ancestor(ancestor),
        })
    }

    /// Resolve a member as `ancestor` defined it, bypassing overrides.
    fn ancestor_member(&self, ancestor: &str, method: &str) -> Option<Option<Member>> {
        for link in &self.proto_chain {
            if link.matches(ancestor) {
                let found = match link {
                    ProtoLink::Mixin { members, .. } => members.get(method).cloned(),
                    ProtoLink::Superclass(class) => class.members.get(method).cloned(),
                };
                return Some(found);
            }
            if let ProtoLink::Superclass(class) = link {
                if let Some(found) = class.ancestor_member(ancestor, method) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Invoke a static member.
    pub fn call_static(self: &Arc<Self>, method: &str, args: &[Variant]) -> Result<MethodReturn> {
        let member = self.statics.get(method).ok_or_else(|| ClassError::UnknownMethod {
            class: self.name.clone(),
            method: method.to_string(),
        })?;
        match member.as_method() {
            Some(f) => {
                // Statics dispatch against a throwaway instance of the class.
                let receiver = Instance::create(self.clone());
                f(&receiver, args)
            }
            None => Err(ClassError::NotAMethod {
                class: self.name.clone(),
                method: method.to_string(),
            }
            .into()),
        }
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("superclass", &self.superclass.as_ref().map(|c| c.name()))
            .field("mixins", &self.mixin_names)
            .field("members", &self.members.len())
            .finish()
    }
}

/// Runs once when the class is built; classes use it to self-register
/// constructors and other global hookups.
pub type InitClassFn = Arc<dyn Fn(&Arc<Class>, &Runtime) + Send + Sync>;

/// Builder for [`Class`].
///
/// `build` resolves the superclass by name, applies mixins in declaration
/// order, merges own members on top, registers the class with the
/// runtime, and finally runs the `init_class` hook.
pub struct ClassBuilder {
    name: String,
    superclass: Option<String>,
    mixins: Vec<MixinSpec>,
    members: MemberTable,
    statics: MemberTable,
    init_class: Option<InitClassFn>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: None,
            mixins: Vec::new(),
            members: MemberTable::new(),
            statics: MemberTable::new(),
            init_class: None,
        }
    }

    /// Extend the named class. Unknown names fail `build`.
    pub fn superclass(mut self, name: impl Into<String>) -> Self {
        self.superclass = Some(name.into());
        self
    }

    /// Apply mixins; may be called repeatedly, order is preserved.
    pub fn mixin(mut self, spec: impl Into<MixinSpec>) -> Self {
        self.mixins.push(spec.into());
        self
    }

    /// The class's own members (highest precedence).
    pub fn members(mut self, members: MemberTable) -> Self {
        self.members = members;
        self
    }

    /// Class-level members, not inherited by instances.
    pub fn statics(mut self, statics: MemberTable) -> Self {
        self.statics = statics;
        self
    }

    /// Hook invoked synchronously after the class registers.
    pub fn init_class<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Arc<Class>, &Runtime) + Send + Sync + 'static,
    {
        self.init_class = Some(Arc::new(hook));
        self
    }

    /// Build, register with `runtime`, and run the init hook.
    pub fn build(self, runtime: &Runtime) -> Result<Arc<Class>> {
        let superclass = match &self.superclass {
            Some(name) => Some(runtime.classes().get(name).ok_or_else(|| {
                ClassError::UnknownAncestor {
                    class: self.name.clone(),
                    ancestor: name.clone(),
                }
            })?),
            None => None,
        };

        let mut members = match &superclass {
            Some(sup) => sup.members.clone(),
            None => MemberTable::new(),
        };

        let mut mixin_names = Vec::new();
        for spec in self.mixins {
            let applied = runtime.mixins().apply(&mut members, spec);
            mixin_names.extend(applied);
        }

        members.extend(&self.members);

        // Most specific first: mixins in reverse application order, then
        // the superclass.
        let mut proto_chain = Vec::new();
        for name in mixin_names.iter().rev() {
            if let Some(def) = runtime.mixins().get(name) {
                proto_chain.push(ProtoLink::Mixin {
                    name: name.clone(),
                    members: def.members().clone(),
                });
            }
        }
        if let Some(sup) = &superclass {
            proto_chain.push(ProtoLink::Superclass(sup.clone()));
        }

        let class = Arc::new(Class {
            name: self.name,
            superclass,
            mixin_names,
            members,
            own_members: self.members,
            statics: self.statics,
            proto_chain,
        });

        runtime.classes().register(class.clone());
        if let Some(hook) = &self.init_class {
            hook(&class, runtime);
        }
        Ok(class)
    }
}

/// Registry of built classes, keyed by name.
#[derive(Default)]
pub struct ClassRegistry {
    classes: RwLock<HashMap<String, Arc<Class>>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class, replacing any previous definition of the name.
    pub fn register(&self, class: Arc<Class>) {
        let previous = self
            .classes
            .write()
            .insert(class.name().to_string(), class.clone());
        if previous.is_some() {
            tracing::trace!(
                target: "horizon_trellis_core::class",
                name = %class.name(),
                "replacing registered class"
            );
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Class>> {
        self.classes.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.read().contains_key(name)
    }

    /// Names of every registered class, in no particular order.
    pub fn names(&self) -> Vec<String> {
        self.classes.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("len", &self.len())
            .finish()
    }
}

/// A dynamic instance of a [`Class`].
pub struct Instance {
    class: Arc<Class>,
    state: Mutex<OrderedMap<Variant>>,
    soon: SoonScheduler,
    bound: BoundCache,
    singleton: AtomicBool,
    /// Fires with the property name after a state write changes a value.
    pub changed: Signal<String>,
}

impl Instance {
    /// Create an instance, seeding state from the class's data members.
    pub fn create(class: Arc<Class>) -> Arc<Self> {
        let mut state = OrderedMap::new();
        for (name, member) in class.members().iter() {
            if let Some(value) = member.as_data() {
                state.insert(name, value.clone());
            }
        }

        Arc::new_cyclic(|weak: &Weak<Instance>| {
            let owner = weak.clone();
            let dispatch: SoonDispatch = Arc::new(move |method, args| {
                match owner.upgrade() {
                    Some(instance) => instance.call(method, args),
                    None => Err(TrellisError::Soon(SoonError::OwnerDropped)),
                }
            });
            Self {
                class,
                state: Mutex::new(state),
                soon: SoonScheduler::new(dispatch),
                bound: BoundCache::new(),
                singleton: AtomicBool::new(false),
                changed: Signal::new(),
            }
        })
    }

    /// The instance's class.
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    /// Read a state property.
    pub fn get(&self, name: &str) -> Variant {
        self.state.lock().get(name).cloned().unwrap_or(Variant::Null)
    }

    /// Write a state property, returning `true` if the value changed.
    pub fn set(&self, name: &str, value: impl Into<Variant>) -> bool {
        let value = value.into();
        let changed = {
            let mut state = self.state.lock();
            if state.get(name) == Some(&value) {
                false
            } else {
                state.insert(name, value);
                true
            }
        };
        if changed {
            self.changed.emit(name.to_string());
        }
        changed
    }

    /// Names of all enumerable state properties, in declaration/insertion
    /// order. Hidden members are skipped.
    pub fn state_keys(&self) -> Vec<String> {
        self.state
            .lock()
            .keys()
            .iter()
            .filter(|name| !self.is_hidden_member(name))
            .cloned()
            .collect()
    }

    /// A snapshot of the enumerable state bag. Hidden members are skipped.
    pub fn state_snapshot(&self) -> OrderedMap<Variant> {
        let state = self.state.lock();
        let mut snapshot = OrderedMap::new();
        for (name, value) in state.iter() {
            if !self.is_hidden_member(name) {
                snapshot.insert(name, value.clone());
            }
        }
        snapshot
    }

    fn is_hidden_member(&self, name: &str) -> bool {
        self.class
            .members()
            .get(name)
            .is_some_and(Member::is_hidden)
    }

    /// Invoke a method through the merged member table.
    pub fn call(self: &Arc<Self>, method: &str, args: &[Variant]) -> Result<MethodReturn> {
        let member = self.class.members().get(method).cloned().ok_or_else(|| {
            ClassError::UnknownMethod {
                class: self.class.name().to_string(),
                method: method.to_string(),
            }
        })?;
        match member.as_method() {
            Some(f) => f(self, args),
            None => Err(ClassError::NotAMethod {
                class: self.class.name().to_string(),
                method: method.to_string(),
            }
            .into()),
        }
    }

    /// Invoke a method if the class defines one; `Ok(None)` otherwise.
    pub fn call_if_present(
        self: &Arc<Self>,
        method: &str,
        args: &[Variant],
    ) -> Result<Option<MethodReturn>> {
        match self.class.members().get(method) {
            Some(member) if member.is_method() => self.call(method, args).map(Some),
            _ => Ok(None),
        }
    }

    /// Invoke `method` as `ancestor` defined it, bypassing overrides.
    ///
    /// `ancestor` may name a mixin applied to this class or any class in
    /// the superclass chain (including the superclasses' own mixins).
    pub fn as_ancestor(
        self: &Arc<Self>,
        ancestor: &str,
        method: &str,
        args: &[Variant],
    ) -> Result<MethodReturn> {
        let found = self.class.ancestor_member(ancestor, method).ok_or_else(|| {
            ClassError::UnknownAncestor {
                class: self.class.name().to_string(),
                ancestor: ancestor.to_string(),
            }
        })?;
        let member = found.ok_or_else(|| ClassError::UnknownMethod {
            class: ancestor.to_string(),
            method: method.to_string(),
        })?;
        match member.as_method() {
            Some(f) => f(self, args),
            None => Err(ClassError::NotAMethod {
                class: ancestor.to_string(),
                method: method.to_string(),
            }
            .into()),
        }
    }

    /// Schedule `method` with the default debounce delay.
    pub fn soon(&self, method: &str, args: Vec<Variant>) -> SoonHandle {
        self.soon.soon(method, args)
    }

    /// Schedule `method` after an explicit delay.
    pub fn soon_after(&self, method: &str, delay: Duration, args: Vec<Variant>) -> SoonHandle {
        self.soon.soon_after(method, delay, args)
    }

    /// Schedule `method` after a whole-seconds delay.
    pub fn soon_secs(&self, method: &str, secs: u64, args: Vec<Variant>) -> SoonHandle {
        self.soon.soon_secs(method, secs, args)
    }

    /// Cancel a pending scheduled call.
    pub fn clear_soon(&self, method: &str) -> bool {
        self.soon.clear_soon(method)
    }

    /// Direct access to the embedded scheduler, mainly for pumping.
    pub fn scheduler(&self) -> &SoonScheduler {
        &self.soon
    }

    /// A memoized bound handle for `method`.
    ///
    /// Repeated calls return the same `Arc`, so connections keyed by
    /// handle identity dedup correctly.
    pub fn bind(self: &Arc<Self>, method: &str) -> Arc<BoundMethod> {
        if !self.class.members().contains(method) {
            tracing::warn!(
                target: "horizon_trellis_core::class",
                class = %self.class.name(),
                method,
                "binding a method the class does not define"
            );
        }
        self.bound.bind(self, method)
    }

    /// A memoized debounced trigger for `method`.
    pub fn bind_soon(self: &Arc<Self>, method: &str, delay: Duration) -> Arc<BoundSoon> {
        self.bound.bind_soon(self, method, delay)
    }

    /// Mark this instance as a registered singleton.
    pub(crate) fn mark_singleton(&self) {
        self.singleton.store(true, Ordering::Release);
    }

    /// Whether this instance is a registered singleton.
    pub fn is_singleton(&self) -> bool {
        self.singleton.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name())
            .field("state_len", &self.state.lock().len())
            .field("singleton", &self.is_singleton())
            .finish()
    }
}
