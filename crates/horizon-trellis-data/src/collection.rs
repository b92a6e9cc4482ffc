//! The collection load-state machine.
//!
//! A collection pairs a [`CollectionBase`] (load state, transport handle,
//! debounced change notification) with type-specific hooks: how to reset
//! its data, how to parse a loaded payload, and what request describes
//! its source. The provided operations on [`CollectionExt`] drive the
//! lifecycle.
//!
//! Completions race: starting a new load bumps a generation counter and
//! cancels the in-flight token, so a completion from a superseded fetch
//! is discarded instead of clobbering fresher data.
//!
//! Change notification is debounced through a soon scheduler: any burst
//! of mutations collapses into a single dispatch when the scheduler is
//! pumped, and each dispatch runs the collection's `update_data` hook
//! before emitting `changed`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use horizon_trellis_core::member::MethodReturn;
use horizon_trellis_core::signal::{ConnectionId, Signal};
use horizon_trellis_core::soon::{SoonDispatch, SoonScheduler};
use horizon_trellis_core::variant::Variant;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{DataError, Result};
use crate::loadable::{LoadState, Loadable};
use crate::transport::{CancelToken, FetchCallback, Transport, TransportRequest};

const CHANGED_KEY: &str = "changed";

/// Shared plumbing every collection embeds.
pub struct CollectionBase {
    transport: Arc<dyn Transport>,
    loadable: Loadable,
    changed: Arc<Signal<()>>,
    owner: Arc<Mutex<Option<Weak<dyn Collection>>>>,
    soon: SoonScheduler,
    generation: AtomicU64,
    cancel: Mutex<Option<CancelToken>>,
}

impl CollectionBase {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let changed = Arc::new(Signal::new());
        let changed_clone = changed.clone();
        let owner: Arc<Mutex<Option<Weak<dyn Collection>>>> = Arc::new(Mutex::new(None));
        let owner_clone = owner.clone();
        let dispatch: SoonDispatch = Arc::new(move |key, _args| {
            if key == CHANGED_KEY {
                // Derived data is recomputed on every dispatch, before
                // listeners hear about the change.
                let collection = owner_clone.lock().as_ref().and_then(Weak::upgrade);
                if let Some(collection) = collection {
                    collection.update_data();
                }
                changed_clone.emit(());
            }
            Ok(MethodReturn::Value(Variant::Null))
        });
        Self {
            transport,
            loadable: Loadable::new(),
            changed,
            owner,
            soon: SoonScheduler::new(dispatch),
            generation: AtomicU64::new(0),
            cancel: Mutex::new(None),
        }
    }

    /// Point the change dispatch at the owning collection.
    ///
    /// Constructors call this once after wrapping the collection in its
    /// `Arc`; until then the dispatch emits without an `update_data` pass.
    pub fn attach<C: Collection>(&self, collection: &Arc<C>) {
        let weak: Weak<dyn Collection> = Arc::<C>::downgrade(collection);
        *self.owner.lock() = Some(weak);
    }

    /// The load-state collaborator.
    pub fn loadable(&self) -> &Loadable {
        &self.loadable
    }

    /// The debounced change signal.
    pub fn changed(&self) -> &Signal<()> {
        &self.changed
    }

    /// The transport requests go through.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Schedule a debounced `changed` emission.
    ///
    /// Repeated calls before the scheduler is pumped collapse into one
    /// emission.
    pub fn notify_changed(&self) {
        self.soon.soon(CHANGED_KEY, vec![]);
    }

    /// Fire due scheduled notifications. Returns the number fired.
    pub fn pump(&self) -> usize {
        self.soon.process_ready()
    }

    /// Duration until the next scheduled notification fires.
    pub fn time_until_next(&self) -> Option<std::time::Duration> {
        self.soon.time_until_next()
    }

    /// The current load generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Supersede any in-flight load: cancel its token and bump the
    /// generation so its completion will be discarded.
    pub fn cancel_in_flight(&self) -> u64 {
        if let Some(token) = self.cancel.lock().take() {
            token.cancel();
        }
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn begin_load(&self) -> (u64, CancelToken) {
        let generation = self.cancel_in_flight();
        let token = CancelToken::new();
        *self.cancel.lock() = Some(token.clone());
        (generation, token)
    }
}

impl fmt::Debug for CollectionBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionBase")
            .field("state", &self.loadable.state())
            .field("generation", &self.generation())
            .finish()
    }
}

/// Type-specific hooks a collection implements.
pub trait Collection: Send + Sync + 'static {
    /// The embedded base.
    fn base(&self) -> &CollectionBase;

    /// The request describing this collection's source.
    fn request(&self) -> TransportRequest;

    /// Reset data to its initial value.
    fn init_data(&self);

    /// Absorb a successfully loaded payload.
    fn parse_loaded_results(&self, payload: &Value) -> Result<()>;

    /// Derived-data recompute hook.
    ///
    /// Runs on every debounced change dispatch, immediately before the
    /// `changed` signal is emitted, whether the change came from a load,
    /// an unload, a load failure, or a direct data mutation.
    fn update_data(&self) {}
}

/// Provided lifecycle operations, implemented for every [`Collection`].
pub trait CollectionExt: Collection + Sized {
    /// Start loading, superseding any in-flight load.
    fn load(self: &Arc<Self>) {
        let (generation, token) = self.base().begin_load();
        self.base().loadable().begin_loading();
        tracing::trace!(
            target: "horizon_trellis_data::collection",
            generation,
            "starting load"
        );

        let weak = Arc::downgrade(self);
        let done: FetchCallback = Box::new(move |result| {
            if let Some(collection) = weak.upgrade() {
                collection.complete_load(generation, result);
            }
        });
        self.base().transport().fetch(self.request(), token, done);
    }

    /// Absorb a load completion; stale generations are discarded.
    fn complete_load(self: &Arc<Self>, generation: u64, result: Result<Value>) {
        let base = self.base();
        if base.generation() != generation {
            tracing::trace!(
                target: "horizon_trellis_data::collection",
                generation,
                current = base.generation(),
                "discarding stale load completion"
            );
            return;
        }
        match result.and_then(|payload| self.parse_loaded_results(&payload)) {
            Ok(()) => {
                base.loadable().finish_loaded();
            }
            Err(err) => {
                base.loadable().fail(err.to_string());
            }
        }
        base.notify_changed();
    }

    /// Cancel any in-flight load, reset data, return to `Unloaded`.
    fn unload(self: &Arc<Self>) {
        let base = self.base();
        base.cancel_in_flight();
        self.init_data();
        base.loadable().reset();
        base.notify_changed();
    }

    /// Unload and load again.
    fn reload(self: &Arc<Self>) {
        self.unload();
        self.load();
    }

    /// Connect to the successful-load signal.
    fn on_loaded<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&()) + Send + Sync + 'static,
    {
        self.base().loadable().loaded.connect(slot)
    }

    /// Connect to the failed-load signal.
    fn on_load_error<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        self.base().loadable().load_error.connect(slot)
    }

    /// Connect to the unload signal.
    fn on_unloaded<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&()) + Send + Sync + 'static,
    {
        self.base().loadable().unloaded.connect(slot)
    }

    /// Connect to the debounced data-changed signal.
    fn on_data_changed<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&()) + Send + Sync + 'static,
    {
        self.base().changed().connect(slot)
    }
}

impl<T: Collection> CollectionExt for T {}

/// A collection whose data is a plain ordered list of JSON values.
pub struct VecCollection {
    base: CollectionBase,
    request: TransportRequest,
    items: Mutex<Vec<Value>>,
}

impl VecCollection {
    pub fn new(transport: Arc<dyn Transport>, request: TransportRequest) -> Arc<Self> {
        let collection = Arc::new(Self {
            base: CollectionBase::new(transport),
            request,
            items: Mutex::new(Vec::new()),
        });
        collection.base.attach(&collection);
        collection
    }

    /// A snapshot of the loaded items.
    pub fn items(&self) -> Vec<Value> {
        self.items.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl Collection for VecCollection {
    fn base(&self) -> &CollectionBase {
        &self.base
    }

    fn request(&self) -> TransportRequest {
        self.request.clone()
    }

    fn init_data(&self) {
        self.items.lock().clear();
    }

    fn parse_loaded_results(&self, payload: &Value) -> Result<()> {
        let list = payload
            .as_array()
            .ok_or_else(|| DataError::UnexpectedShape("expected a JSON array".to_string()))?;
        *self.items.lock() = list.clone();
        Ok(())
    }
}

impl fmt::Debug for VecCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VecCollection")
            .field("state", &self.base.loadable().state())
            .field("len", &self.len())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::QueuedTransport;
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_load_lifecycle_with_one_debounced_change() {
        let transport = QueuedTransport::new();
        let collection = VecCollection::new(
            transport.clone(),
            TransportRequest::get("https://api.example.com/items"),
        );

        let loads = Arc::new(AtomicUsize::new(0));
        let changes = Arc::new(AtomicUsize::new(0));
        let loads_clone = loads.clone();
        let changes_clone = changes.clone();
        collection.on_loaded(move |_| {
            loads_clone.fetch_add(1, Ordering::SeqCst);
        });
        collection.on_data_changed(move |_| {
            changes_clone.fetch_add(1, Ordering::SeqCst);
        });

        collection.load();
        assert_eq!(collection.base().loadable().state(), LoadState::Loading);

        transport.complete_next(Ok(json!([{"id": "a"}, {"id": "b"}])));
        assert_eq!(collection.base().loadable().state(), LoadState::Loaded);
        assert_eq!(collection.len(), 2);
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        // The changed notification is debounced; pumping fires exactly one.
        std::thread::sleep(std::time::Duration::from_millis(15));
        assert_eq!(collection.base().pump(), 1);
        assert_eq!(changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_burst_of_changes_collapses() {
        let transport = QueuedTransport::new();
        let collection = VecCollection::new(
            transport,
            TransportRequest::get("https://api.example.com/items"),
        );

        let changes = Arc::new(AtomicUsize::new(0));
        let changes_clone = changes.clone();
        collection.on_data_changed(move |_| {
            changes_clone.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..10 {
            collection.base().notify_changed();
        }
        std::thread::sleep(std::time::Duration::from_millis(15));
        collection.base().pump();
        assert_eq!(changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_lands_in_error_state() {
        let transport = QueuedTransport::new();
        let collection = VecCollection::new(
            transport.clone(),
            TransportRequest::get("https://api.example.com/items"),
        );

        let errors = Arc::new(Mutex::new(Vec::new()));
        let errors_clone = errors.clone();
        collection.on_load_error(move |message: &String| {
            errors_clone.lock().push(message.clone());
        });

        collection.load();
        transport.complete_next(Err(DataError::Transport("connection refused".to_string())));

        assert_eq!(collection.base().loadable().state(), LoadState::LoadError);
        assert_eq!(errors.lock().len(), 1);
        assert!(errors.lock()[0].contains("connection refused"));
    }

    #[test]
    fn test_bad_shape_is_load_error_not_panic() {
        let transport = QueuedTransport::new();
        let collection = VecCollection::new(
            transport.clone(),
            TransportRequest::get("https://api.example.com/items"),
        );

        collection.load();
        transport.complete_next(Ok(json!({"not": "an array"})));
        assert_eq!(collection.base().loadable().state(), LoadState::LoadError);
        assert!(collection.is_empty());
    }

    #[test]
    fn test_stale_completion_discarded() {
        let transport = QueuedTransport::new();
        let collection = VecCollection::new(
            transport.clone(),
            TransportRequest::get("https://api.example.com/items"),
        );

        collection.load();
        // A second load supersedes the first.
        collection.load();
        assert_eq!(transport.pending_count(), 2);

        // The first completion is stale and must not become the data.
        transport.complete_next(Ok(json!([{"id": "old"}])));
        assert_eq!(collection.base().loadable().state(), LoadState::Loading);
        assert!(collection.is_empty());

        transport.complete_next(Ok(json!([{"id": "new"}, {"id": "newer"}])));
        assert_eq!(collection.base().loadable().state(), LoadState::Loaded);
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn test_unload_resets_data_and_state() {
        let transport = QueuedTransport::new();
        let collection = VecCollection::new(
            transport.clone(),
            TransportRequest::get("https://api.example.com/items"),
        );

        let unloads = Arc::new(AtomicUsize::new(0));
        let unloads_clone = unloads.clone();
        collection.on_unloaded(move |_| {
            unloads_clone.fetch_add(1, Ordering::SeqCst);
        });

        collection.load();
        transport.complete_next(Ok(json!([1, 2, 3])));
        assert_eq!(collection.len(), 3);

        collection.unload();
        assert!(collection.is_empty());
        assert_eq!(collection.base().loadable().state(), LoadState::Unloaded);
        assert_eq!(unloads.load(Ordering::SeqCst), 1);
    }

    struct RecomputingCollection {
        base: CollectionBase,
        events: Arc<Mutex<Vec<&'static str>>>,
    }

    impl RecomputingCollection {
        fn new(transport: Arc<dyn Transport>) -> Arc<Self> {
            let collection = Arc::new(Self {
                base: CollectionBase::new(transport),
                events: Arc::new(Mutex::new(Vec::new())),
            });
            collection.base.attach(&collection);
            collection
        }
    }

    impl Collection for RecomputingCollection {
        fn base(&self) -> &CollectionBase {
            &self.base
        }

        fn request(&self) -> TransportRequest {
            TransportRequest::get("https://api.example.com/derived")
        }

        fn init_data(&self) {}

        fn parse_loaded_results(&self, _payload: &Value) -> Result<()> {
            Ok(())
        }

        fn update_data(&self) {
            self.events.lock().push("update_data");
        }
    }

    #[test]
    fn test_update_data_runs_before_each_changed_emission() {
        let transport = QueuedTransport::new();
        let collection = RecomputingCollection::new(transport.clone());

        let events = collection.events.clone();
        collection.on_data_changed(move |_| {
            events.lock().push("changed");
        });

        // A burst of direct mutations collapses into one dispatch, and the
        // recompute hook runs inside it ahead of the emission.
        collection.base().notify_changed();
        collection.base().notify_changed();
        std::thread::sleep(std::time::Duration::from_millis(15));
        collection.base().pump();
        assert_eq!(*collection.events.lock(), vec!["update_data", "changed"]);

        // The load-error path dispatches the same way.
        collection.load();
        transport.complete_next(Err(DataError::Transport("boom".to_string())));
        std::thread::sleep(std::time::Duration::from_millis(15));
        collection.base().pump();
        assert_eq!(
            *collection.events.lock(),
            vec!["update_data", "changed", "update_data", "changed"]
        );

        // And so does unload.
        collection.unload();
        std::thread::sleep(std::time::Duration::from_millis(15));
        collection.base().pump();
        assert_eq!(
            *collection.events.lock(),
            vec![
                "update_data",
                "changed",
                "update_data",
                "changed",
                "update_data",
                "changed"
            ]
        );
    }

    #[test]
    fn test_unload_cancels_in_flight_token() {
        let transport = QueuedTransport::new();
        let collection = VecCollection::new(
            transport.clone(),
            TransportRequest::get("https://api.example.com/items"),
        );

        collection.load();
        collection.unload();

        // The superseded completion arrives afterwards and is ignored.
        transport.complete_next(Ok(json!([1])));
        assert!(collection.is_empty());
        assert_eq!(collection.base().loadable().state(), LoadState::Unloaded);
    }
}
