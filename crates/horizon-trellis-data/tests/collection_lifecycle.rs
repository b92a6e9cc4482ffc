//! End-to-end tests for the collection load lifecycle: transport fan-out,
//! typed hydration, pagination, and the debounced change notification.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use horizon_trellis_core::class::ClassBuilder;
use horizon_trellis_core::member::MemberTable;
use horizon_trellis_core::runtime::Runtime;
use horizon_trellis_core::variant::Variant;
use horizon_trellis_data::{
    register_class_constructor, CancelToken, Collection, CollectionExt, FetchCallback,
    JsonCollectionBuilder, LoadState, PagedCollection, Result, Transport, TransportRequest,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Transport that parks fetches until the test releases them.
#[derive(Default)]
struct StagedTransport {
    pending: Mutex<Vec<(TransportRequest, CancelToken, FetchCallback)>>,
}

impl StagedTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn release_next(&self, result: Result<Value>) {
        let next = {
            let mut pending = self.pending.lock();
            if pending.is_empty() {
                panic!("no pending fetch to release");
            }
            pending.remove(0)
        };
        (next.2)(result);
    }

    fn last_request(&self) -> TransportRequest {
        let pending = self.pending.lock();
        pending
            .last()
            .map(|(request, _, _)| request.clone())
            .unwrap_or_default()
    }

    fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Transport for StagedTransport {
    fn fetch(&self, request: TransportRequest, cancel: CancelToken, done: FetchCallback) {
        self.pending.lock().push((request, cancel, done));
    }
}

fn note_runtime() -> Arc<Runtime> {
    let runtime = Arc::new(Runtime::new());
    let class = ClassBuilder::new("Note")
        .members(
            MemberTable::new()
                .with_data("id", Variant::Null)
                .with_data("text", ""),
        )
        .build(&runtime)
        .unwrap();
    register_class_constructor(&runtime, "note", class);
    runtime
}

#[test]
fn typed_collection_full_lifecycle() {
    let runtime = note_runtime();
    let transport = StagedTransport::new();
    let collection = JsonCollectionBuilder::new(
        "notes",
        TransportRequest::get("https://api.example.com/notes"),
    )
    .default_item_type("note")
    .build(runtime, transport.clone());

    let loads = Arc::new(AtomicUsize::new(0));
    let loads_seen = loads.clone();
    collection.on_loaded(move |_| {
        loads_seen.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(collection.base().loadable().state(), LoadState::Unloaded);
    collection.load();
    assert_eq!(collection.base().loadable().state(), LoadState::Loading);

    transport.release_next(Ok(json!([
        {"id": "n1", "text": "alpha"},
        {"id": "n2", "text": "beta"},
    ])));

    assert_eq!(collection.base().loadable().state(), LoadState::Loaded);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(collection.len(), 2);
    assert_eq!(
        collection.get_by_key("n2").unwrap().get("text"),
        Variant::from("beta")
    );
}

#[test]
fn burst_of_mutations_emits_one_changed() {
    let runtime = note_runtime();
    let transport = StagedTransport::new();
    let collection = JsonCollectionBuilder::new(
        "notes",
        TransportRequest::get("https://api.example.com/notes"),
    )
    .default_item_type("note")
    .build(runtime, transport.clone());

    let emissions = Arc::new(AtomicUsize::new(0));
    let emissions_seen = emissions.clone();
    collection.on_data_changed(move |_| {
        emissions_seen.fetch_add(1, Ordering::SeqCst);
    });

    collection.load();
    // Parsing three items stamps three back-references plus the final
    // completion notification, all within one debounce window.
    transport.release_next(Ok(json!([
        {"id": "a"},
        {"id": "b"},
        {"id": "c"},
    ])));

    thread::sleep(Duration::from_millis(20));
    collection.base().pump();
    assert_eq!(emissions.load(Ordering::SeqCst), 1);
}

#[test]
fn superseded_load_is_discarded() {
    let runtime = note_runtime();
    let transport = StagedTransport::new();
    let collection = JsonCollectionBuilder::new(
        "notes",
        TransportRequest::get("https://api.example.com/notes"),
    )
    .default_item_type("note")
    .build(runtime, transport.clone());

    collection.load();
    collection.load();
    assert_eq!(transport.pending_count(), 2);

    // The first (stale) completion must not disturb the second load.
    transport.release_next(Ok(json!([{"id": "stale"}])));
    assert_eq!(collection.base().loadable().state(), LoadState::Loading);
    assert!(collection.is_empty());

    transport.release_next(Ok(json!([{"id": "fresh"}])));
    assert_eq!(collection.base().loadable().state(), LoadState::Loaded);
    assert!(collection.get_by_key("fresh").is_some());
}

#[test]
fn load_failure_surfaces_through_signal() {
    let runtime = note_runtime();
    let transport = StagedTransport::new();
    let collection = JsonCollectionBuilder::new(
        "notes",
        TransportRequest::get("https://api.example.com/notes"),
    )
    .default_item_type("note")
    .build(runtime, transport.clone());

    let message = Arc::new(Mutex::new(String::new()));
    let message_seen = message.clone();
    collection.on_load_error(move |err| {
        *message_seen.lock() = err.clone();
    });

    collection.load();
    transport.release_next(Err(
        horizon_trellis_data::DataError::Transport("connection refused".to_string()),
    ));

    assert_eq!(collection.base().loadable().state(), LoadState::LoadError);
    assert!(message.lock().contains("connection refused"));

    // A fresh load clears the recorded failure.
    collection.load();
    transport.release_next(Ok(json!([])));
    assert_eq!(collection.base().loadable().state(), LoadState::Loaded);
}

#[test]
fn paged_collection_binds_page_params() {
    let transport = StagedTransport::new();
    let collection = PagedCollection::new(
        transport.clone(),
        TransportRequest::get("https://api.example.com/rows?page={page}&size={page_size}"),
        25,
    );

    // The page count is unknown before the first load, so any requested
    // page maps to page 0.
    collection.load_page(3);
    let request = transport.last_request();
    assert_eq!(request.params().get("page"), Some(&"0".to_string()));
    assert_eq!(request.params().get("page_size"), Some(&"25".to_string()));

    transport.release_next(Ok(json!({
        "items": [{"row": 1}, {"row": 2}],
        "page_count": 7,
    })));

    assert_eq!(collection.base().loadable().state(), LoadState::Loaded);
    assert_eq!(collection.page_count(), 7);
    assert_eq!(collection.items().len(), 2);

    collection.load_page(3);
    let request = transport.last_request();
    assert_eq!(request.params().get("page"), Some(&"3".to_string()));
    assert_eq!(collection.page_number(), 3);
    transport.release_next(Ok(json!({"items": [], "page_count": 7})));

    // Requests past the end clamp to the last known page.
    collection.load_page(99);
    let request = transport.last_request();
    assert_eq!(request.params().get("page"), Some(&"6".to_string()));
}
