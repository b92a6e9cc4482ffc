//! Collections of typed, hydrated instances.
//!
//! A [`JsonCollection`] loads a JSON array and turns each element into an
//! [`Instance`] through the runtime's constructor registry. The type tag
//! comes from the element's `type` field, falling back to the
//! collection's configured default; elements that resolve to no
//! constructor are skipped with a warning rather than failing the load.
//!
//! Items are held in an [`IndexedList`] keyed by the collection's index
//! key (`id` by default), so lookup by id stays O(1) alongside ordered
//! iteration.

use std::fmt;
use std::sync::Arc;

use horizon_trellis_core::class::Instance;
use horizon_trellis_core::indexed_list::IndexedList;
use horizon_trellis_core::runtime::Runtime;
use horizon_trellis_core::variant::Variant;
use parking_lot::Mutex;
use serde_json::Value;

use crate::collection::{Collection, CollectionBase};
use crate::error::{DataError, Result};
use crate::json_data::json_to_variant;
use crate::transport::{Transport, TransportRequest};

/// State property on items that points back at the owning collection.
const COLLECTION_KEY: &str = "collection";

/// Declarative configuration for a [`JsonCollection`].
pub struct JsonCollectionBuilder {
    name: String,
    request: TransportRequest,
    default_item_type: Option<String>,
    item_index_key: String,
}

impl JsonCollectionBuilder {
    /// `name` identifies the collection in item back-references.
    pub fn new(name: impl Into<String>, request: TransportRequest) -> Self {
        Self {
            name: name.into(),
            request,
            default_item_type: None,
            item_index_key: "id".to_string(),
        }
    }

    /// Type tag used for elements without their own `type` field.
    pub fn default_item_type(mut self, tag: impl Into<String>) -> Self {
        self.default_item_type = Some(tag.into());
        self
    }

    /// State property items are indexed by (default `id`).
    pub fn item_index_key(mut self, key: impl Into<String>) -> Self {
        self.item_index_key = key.into();
        self
    }

    pub fn build(
        self,
        runtime: Arc<Runtime>,
        transport: Arc<dyn Transport>,
    ) -> Arc<JsonCollection> {
        let index_key = self.item_index_key.clone();
        let collection = Arc::new(JsonCollection {
            base: CollectionBase::new(transport),
            runtime,
            name: self.name,
            request: self.request,
            default_item_type: self.default_item_type,
            item_index_key: self.item_index_key,
            items: Mutex::new(IndexedList::new(move |item: &Arc<Instance>| {
                item.get(&index_key).as_key()
            })),
        });
        collection.base.attach(&collection);
        collection
    }
}

/// A collection whose data is typed instances hydrated from JSON.
pub struct JsonCollection {
    base: CollectionBase,
    runtime: Arc<Runtime>,
    name: String,
    request: TransportRequest,
    default_item_type: Option<String>,
    item_index_key: String,
    items: Mutex<IndexedList<Arc<Instance>>>,
}

impl JsonCollection {
    /// The collection's back-reference name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The state property items are indexed by.
    pub fn item_index_key(&self) -> &str {
        &self.item_index_key
    }

    /// The item bound to `key` in the index.
    pub fn get_by_key(&self, key: &str) -> Option<Arc<Instance>> {
        self.items.lock().get_by_key(key).cloned()
    }

    /// An ordered snapshot of the items.
    pub fn items(&self) -> Vec<Arc<Instance>> {
        self.items.lock().to_vec()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Resolve the constructor tag for a data node.
    ///
    /// The node's own `type` field wins; the collection default covers
    /// untagged nodes.
    fn constructor_tag(&self, data: &Variant) -> Option<String> {
        data.get("type")
            .and_then(|v| v.as_text().map(str::to_string))
            .or_else(|| self.default_item_type.clone())
    }

    /// Build one typed item from a data node.
    ///
    /// Returns `None` (with a warning) when no constructor is available;
    /// the load continues without the element.
    fn init_item(&self, data: &Variant) -> Option<Arc<Instance>> {
        let Some(tag) = self.constructor_tag(data) else {
            tracing::warn!(
                target: "horizon_trellis_data::json",
                collection = %self.name,
                "item has no type tag and the collection has no default; skipping"
            );
            return None;
        };
        match self.runtime.constructors().construct(&tag, data) {
            Some(Ok(instance)) => Some(instance),
            Some(Err(err)) => {
                tracing::warn!(
                    target: "horizon_trellis_data::json",
                    collection = %self.name,
                    tag = %tag,
                    error = %err,
                    "constructor failed; skipping item"
                );
                None
            }
            None => {
                tracing::warn!(
                    target: "horizon_trellis_data::json",
                    collection = %self.name,
                    tag = %tag,
                    "no constructor registered for tag; skipping item"
                );
                None
            }
        }
    }

    /// Stamp the back-reference and append the item.
    ///
    /// An item already claimed by a different collection is warned about
    /// but adopted anyway.
    pub fn add_item(&self, instance: Arc<Instance>) {
        let current = instance.get(COLLECTION_KEY);
        if let Some(owner) = current.as_text() {
            if owner != self.name {
                tracing::warn!(
                    target: "horizon_trellis_data::json",
                    collection = %self.name,
                    previous = %owner,
                    "item already belongs to another collection; re-stamping"
                );
            }
        }
        instance.set(COLLECTION_KEY, self.name.clone());
        self.items.lock().push(instance);
        self.base.notify_changed();
    }
}

impl Collection for JsonCollection {
    fn base(&self) -> &CollectionBase {
        &self.base
    }

    fn request(&self) -> TransportRequest {
        self.request.clone()
    }

    fn init_data(&self) {
        let index_key = self.item_index_key.clone();
        *self.items.lock() = IndexedList::new(move |item: &Arc<Instance>| {
            item.get(&index_key).as_key()
        });
    }

    fn parse_loaded_results(&self, payload: &Value) -> Result<()> {
        let list = payload
            .as_array()
            .ok_or_else(|| DataError::UnexpectedShape("expected a JSON array".to_string()))?;

        self.init_data();
        for node in list {
            let data = json_to_variant(node);
            if let Some(instance) = self.init_item(&data) {
                self.add_item(instance);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for JsonCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonCollection")
            .field("name", &self.name)
            .field("state", &self.base.loadable().state())
            .field("len", &self.len())
            .finish()
    }
}
