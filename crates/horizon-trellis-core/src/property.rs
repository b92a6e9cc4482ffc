//! Reactive property cells.
//!
//! Properties are the data backbone of the object model. Alongside the
//! plain reactive cell there are four specialised kinds:
//!
//! - **Property<T>**: a value with change detection; `set` reports whether
//!   the value actually changed so the caller can emit a notification.
//! - **Computed<T>**: derives its value lazily from a closure and caches it
//!   until invalidated.
//! - **Constant<T>**: fixed at construction, read-only thereafter.
//! - **Watched<T>**: holding slot for another observable object; swapping
//!   the held object tears down the old subscriptions and wires up the new
//!   ones automatically.
//! - **Delegated<T>**: reads and writes forward to caller-supplied
//!   closures, with an optional conversion on write.
//!
//! # Example
//!
//! ```ignore
//! use horizon_trellis_core::property::Property;
//! use horizon_trellis_core::signal::Signal;
//!
//! struct Counter {
//!     value: Property<i64>,
//!     value_changed: Signal<i64>,
//! }
//!
//! impl Counter {
//!     fn set_value(&self, new_value: i64) {
//!         if self.value.set(new_value) {
//!             self.value_changed.emit(new_value);
//!         }
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::error::PropertyError;
use crate::ordered_map::OrderedMap;
use crate::signal::Signal;
use crate::variant::Variant;

/// A reactive property that tracks changes.
///
/// `Property<T>` wraps a value and provides change detection. When `set()`
/// is called, it compares the new value with the current one and returns
/// whether the value actually changed.
///
/// # Thread Safety
///
/// `Property<T>` uses interior mutability with `RwLock` and is `Send + Sync`.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Get the current value.
    ///
    /// This clones the value. For large types, consider using `with()`.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }

    /// Set the value without change detection.
    ///
    /// Useful during initialization or batch updates where notifications
    /// are deferred.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if the value changed.
    ///
    /// The caller should emit the associated notification signal when this
    /// returns `true`.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current != value {
            *current = value;
            true
        } else {
            false
        }
    }

    /// Set the value, returning the old value if it changed.
    pub fn replace(&self, value: T) -> Option<T> {
        let mut current = self.value.write();
        if *current != value {
            Some(std::mem::replace(&mut *current, value))
        } else {
            None
        }
    }
}

impl<T: Clone> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self::new(self.get())
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}

/// A computed property that derives its value from a closure.
///
/// `Computed<T>` caches its result and only recalculates after an explicit
/// `invalidate()`. Useful for derived values that depend on several source
/// properties.
pub struct Computed<T> {
    compute: Box<dyn Fn() -> T + Send + Sync>,
    cached: RwLock<Option<T>>,
    dirty: AtomicBool,
}

impl<T: Clone + Send + Sync + 'static> Computed<T> {
    /// Create a computed property.
    ///
    /// The closure runs lazily on first `get()` and again after each
    /// `invalidate()`.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            compute: Box::new(compute),
            cached: RwLock::new(None),
            dirty: AtomicBool::new(true),
        }
    }

    /// Get the current value, computing it if necessary.
    pub fn get(&self) -> T {
        if self.dirty.load(Ordering::Acquire) {
            let value = (self.compute)();
            *self.cached.write() = Some(value.clone());
            self.dirty.store(false, Ordering::Release);
            return value;
        }
        match self.cached.read().clone() {
            Some(value) => value,
            None => {
                let value = (self.compute)();
                *self.cached.write() = Some(value.clone());
                value
            }
        }
    }

    /// Mark the cache stale, forcing recalculation on next `get()`.
    pub fn invalidate(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Whether the next `get()` will recompute.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Invalidate and immediately recompute.
    pub fn refresh(&self) -> T {
        self.invalidate();
        self.get()
    }
}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("dirty", &self.is_dirty())
            .field("cached", &*self.cached.read())
            .finish()
    }
}

/// A value fixed at construction.
///
/// Exists so member declarations can distinguish "this never changes" from
/// an ordinary settable property.
#[derive(Clone)]
pub struct Constant<T> {
    value: T,
}

impl<T: Clone> Constant<T> {
    /// Create a constant.
    pub fn new(value: T) -> Self {
        Self { value }
    }

    /// Get the value.
    pub fn get(&self) -> T {
        self.value.clone()
    }

    /// Access the value without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Constant<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Constant").field(&self.value).finish()
    }
}

/// Tears down a watch subscription when dropped.
pub struct WatchGuard {
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl WatchGuard {
    /// Wrap a teardown closure.
    pub fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A guard with nothing to tear down.
    pub fn noop() -> Self {
        Self { teardown: None }
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl fmt::Debug for WatchGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchGuard")
            .field("armed", &self.teardown.is_some())
            .finish()
    }
}

type WatchHookup<T> = Arc<dyn Fn(&T) -> WatchGuard + Send + Sync>;

/// A holding slot for another observable object.
///
/// Setting the slot disconnects the previously held object (by dropping
/// its [`WatchGuard`]) and connects the new one through the configured
/// hookup closure. The `changed` signal fires with `(new, old)` whenever
/// the held object is swapped.
///
/// Setting a value before [`configure_watch`](Watched::configure_watch)
/// has run logs a warning and only stores the value; no subscription is
/// made.
pub struct Watched<T> {
    name: String,
    value: RwLock<Option<T>>,
    hookup: RwLock<Option<WatchHookup<T>>>,
    guard: Mutex<Option<WatchGuard>>,
    /// Fires `(new, old)` after the slot changes.
    pub changed: Signal<(Option<T>, Option<T>)>,
}

impl<T: Clone + PartialEq> Watched<T> {
    /// Create an empty slot. `name` appears in warning logs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: RwLock::new(None),
            hookup: RwLock::new(None),
            guard: Mutex::new(None),
            changed: Signal::new(),
        }
    }

    /// Install the subscription hookup.
    ///
    /// The closure is called with each newly held object and returns the
    /// guard that will disconnect it when the slot moves on. If a value is
    /// already held, it is wired up immediately.
    pub fn configure_watch<F>(&self, hookup: F)
    where
        F: Fn(&T) -> WatchGuard + Send + Sync + 'static,
    {
        let hookup: WatchHookup<T> = Arc::new(hookup);
        *self.hookup.write() = Some(hookup.clone());
        let held = self.value.read().clone();
        if let Some(current) = held {
            *self.guard.lock() = Some(hookup(&current));
        }
    }

    /// Get the currently held object.
    pub fn get(&self) -> Option<T> {
        self.value.read().clone()
    }

    /// Swap the held object, returning `true` if it changed.
    ///
    /// The old object's subscriptions are torn down before the new one is
    /// wired up. Equal values are a no-op.
    pub fn set(&self, value: Option<T>) -> bool {
        let old = {
            let mut current = self.value.write();
            if *current == value {
                return false;
            }
            std::mem::replace(&mut *current, value.clone())
        };

        // Drop the old guard first so the previous object is fully
        // disconnected before the new one starts observing.
        *self.guard.lock() = None;

        if let Some(new_value) = &value {
            let hookup = self.hookup.read().clone();
            match hookup {
                Some(hookup) => {
                    *self.guard.lock() = Some(hookup(new_value));
                }
                None => {
                    tracing::warn!(
                        target: "horizon_trellis_core::property",
                        slot = %self.name,
                        "watched slot set before a watch hookup was configured; storing only"
                    );
                }
            }
        }

        self.changed.emit((value, old));
        true
    }

    /// Empty the slot, tearing down any subscription.
    pub fn clear(&self) -> bool {
        self.set(None)
    }

    /// Whether a watch hookup has been configured.
    pub fn is_watch_configured(&self) -> bool {
        self.hookup.read().is_some()
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Watched<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watched")
            .field("name", &self.name)
            .field("value", &*self.value.read())
            .field("configured", &self.hookup.read().is_some())
            .finish()
    }
}

/// A property whose reads and writes forward to another location.
///
/// Useful for aliasing a field of a nested object under a flat name. The
/// optional converter runs on every write before the setter sees the
/// value.
pub struct Delegated<T> {
    name: String,
    getter: Arc<dyn Fn() -> T + Send + Sync>,
    setter: Option<Arc<dyn Fn(T) + Send + Sync>>,
    converter: Option<Arc<dyn Fn(T) -> T + Send + Sync>>,
}

impl<T> Delegated<T> {
    /// Create a read-only delegate.
    pub fn readonly<G>(name: impl Into<String>, getter: G) -> Self
    where
        G: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            getter: Arc::new(getter),
            setter: None,
            converter: None,
        }
    }

    /// Create a read-write delegate.
    pub fn new<G, S>(name: impl Into<String>, getter: G, setter: S) -> Self
    where
        G: Fn() -> T + Send + Sync + 'static,
        S: Fn(T) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            getter: Arc::new(getter),
            setter: Some(Arc::new(setter)),
            converter: None,
        }
    }

    /// Add a conversion applied to every write.
    pub fn with_converter<C>(mut self, converter: C) -> Self
    where
        C: Fn(T) -> T + Send + Sync + 'static,
    {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// Read through the getter.
    pub fn get(&self) -> T {
        (self.getter)()
    }

    /// Write through the setter, converting first if configured.
    pub fn set(&self, value: T) -> Result<(), PropertyError> {
        let Some(setter) = &self.setter else {
            return Err(PropertyError::DelegateUnavailable {
                name: self.name.clone(),
            });
        };
        let value = match &self.converter {
            Some(converter) => converter(value),
            None => value,
        };
        setter(value);
        Ok(())
    }
}

impl<T> fmt::Debug for Delegated<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegated")
            .field("name", &self.name)
            .field("writable", &self.setter.is_some())
            .finish()
    }
}

/// Copy-on-write view over a shared default map.
///
/// Instances start out reading through the class-level defaults; the first
/// write clones the defaults into a private map, so writes never leak back
/// into the shared table.
pub struct ProtoMap {
    defaults: Arc<OrderedMap<Variant>>,
    local: RwLock<Option<OrderedMap<Variant>>>,
}

impl ProtoMap {
    /// View over shared defaults.
    pub fn new(defaults: Arc<OrderedMap<Variant>>) -> Self {
        Self {
            defaults,
            local: RwLock::new(None),
        }
    }

    /// Look up `key`, preferring local writes over the defaults.
    pub fn get(&self, key: &str) -> Option<Variant> {
        if let Some(local) = &*self.local.read() {
            return local.get(key).cloned();
        }
        self.defaults.get(key).cloned()
    }

    /// Write `key`, forking the defaults on first write.
    pub fn set(&self, key: &str, value: Variant) -> Option<Variant> {
        let mut local = self.local.write();
        let map = local.get_or_insert_with(|| (*self.defaults).clone());
        map.insert(key, value)
    }

    /// Remove `key` from the local map, forking first.
    pub fn remove(&self, key: &str) -> Option<Variant> {
        let mut local = self.local.write();
        let map = local.get_or_insert_with(|| (*self.defaults).clone());
        map.remove(key)
    }

    /// Whether any write has forked this view off the shared defaults.
    pub fn is_forked(&self) -> bool {
        self.local.read().is_some()
    }

    /// A full snapshot of the effective map.
    pub fn snapshot(&self) -> OrderedMap<Variant> {
        match &*self.local.read() {
            Some(local) => local.clone(),
            None => (*self.defaults).clone(),
        }
    }
}

impl fmt::Debug for ProtoMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtoMap")
            .field("forked", &self.is_forked())
            .field("len", &self.snapshot().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_property_set_detects_change() {
        let prop = Property::new(10);
        assert!(!prop.set(10));
        assert!(prop.set(20));
        assert_eq!(prop.get(), 20);
    }

    #[test]
    fn test_property_replace() {
        let prop = Property::new("hello".to_string());
        assert!(prop.replace("hello".to_string()).is_none());
        assert_eq!(prop.replace("world".to_string()), Some("hello".to_string()));
        assert_eq!(prop.get(), "world");
    }

    #[test]
    fn test_property_with_closure() {
        let prop = Property::new(vec![1, 2, 3]);
        let sum: i32 = prop.with(|v| v.iter().sum());
        assert_eq!(sum, 6);
    }

    #[test]
    fn test_computed_lazy_and_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let computed = Computed::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            42
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(computed.get(), 42);
        assert_eq!(computed.get(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        computed.invalidate();
        assert_eq!(computed.get(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_computed_refresh() {
        let source = Arc::new(Property::new(1));
        let source_clone = source.clone();
        let computed = Computed::new(move || source_clone.get() + 10);

        assert_eq!(computed.get(), 11);
        source.set_silent(5);
        assert_eq!(computed.refresh(), 15);
    }

    #[test]
    fn test_constant() {
        let c = Constant::new("fixed");
        assert_eq!(c.get(), "fixed");
        assert_eq!(c.with(|v| v.len()), 5);
    }

    #[test]
    fn test_watched_tears_down_on_swap() {
        let disconnects = Arc::new(AtomicUsize::new(0));
        let connects = Arc::new(AtomicUsize::new(0));

        let slot: Watched<i32> = Watched::new("target");
        let connects_clone = connects.clone();
        let disconnects_clone = disconnects.clone();
        slot.configure_watch(move |_value| {
            connects_clone.fetch_add(1, Ordering::SeqCst);
            let disconnects = disconnects_clone.clone();
            WatchGuard::new(move || {
                disconnects.fetch_add(1, Ordering::SeqCst);
            })
        });

        assert!(slot.set(Some(1)));
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(disconnects.load(Ordering::SeqCst), 0);

        // Same value is a no-op, no rewiring.
        assert!(!slot.set(Some(1)));
        assert_eq!(connects.load(Ordering::SeqCst), 1);

        assert!(slot.set(Some(2)));
        assert_eq!(connects.load(Ordering::SeqCst), 2);
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);

        assert!(slot.clear());
        assert_eq!(disconnects.load(Ordering::SeqCst), 2);
        assert_eq!(slot.get(), None);
    }

    #[test]
    fn test_watched_emits_new_and_old() {
        let slot: Watched<i32> = Watched::new("target");
        slot.configure_watch(|_| WatchGuard::noop());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        slot.changed.connect(move |(new, old)| {
            seen_clone.lock().push((*new, *old));
        });

        slot.set(Some(1));
        slot.set(Some(2));
        slot.clear();

        assert_eq!(
            *seen.lock(),
            vec![(Some(1), None), (Some(2), Some(1)), (None, Some(2))]
        );
    }

    #[test]
    fn test_watched_unconfigured_stores_only() {
        let slot: Watched<i32> = Watched::new("orphan");
        assert!(!slot.is_watch_configured());
        assert!(slot.set(Some(7)));
        assert_eq!(slot.get(), Some(7));
    }

    #[test]
    fn test_watched_configure_wires_existing_value() {
        let connects = Arc::new(AtomicUsize::new(0));
        let slot: Watched<i32> = Watched::new("late");
        slot.set(Some(3));

        let connects_clone = connects.clone();
        slot.configure_watch(move |_| {
            connects_clone.fetch_add(1, Ordering::SeqCst);
            WatchGuard::noop()
        });
        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delegated_forwards() {
        let backing = Arc::new(Property::new(0));
        let read = backing.clone();
        let write = backing.clone();
        let alias = Delegated::new("count", move || read.get(), move |v| {
            write.set_silent(v);
        })
        .with_converter(|v: i32| v.max(0));

        alias.set(5).unwrap();
        assert_eq!(alias.get(), 5);

        // Converter clamps negatives.
        alias.set(-3).unwrap();
        assert_eq!(backing.get(), 0);
    }

    #[test]
    fn test_delegated_readonly_rejects_writes() {
        let alias = Delegated::readonly("version", || 7);
        assert_eq!(alias.get(), 7);
        assert!(matches!(
            alias.set(9),
            Err(PropertyError::DelegateUnavailable { .. })
        ));
    }

    #[test]
    fn test_proto_map_copy_on_write() {
        let mut defaults = OrderedMap::new();
        defaults.insert("color", Variant::from("blue"));
        defaults.insert("size", Variant::from(4));
        let defaults = Arc::new(defaults);

        let a = ProtoMap::new(defaults.clone());
        let b = ProtoMap::new(defaults.clone());

        assert_eq!(a.get("color"), Some(Variant::from("blue")));
        assert!(!a.is_forked());

        a.set("color", Variant::from("red"));
        assert!(a.is_forked());
        assert_eq!(a.get("color"), Some(Variant::from("red")));

        // The shared defaults and sibling views are untouched.
        assert_eq!(b.get("color"), Some(Variant::from("blue")));
        assert_eq!(defaults.get("color"), Some(&Variant::from("blue")));
    }
}
