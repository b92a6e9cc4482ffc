//! Page-windowed collections.
//!
//! A [`PagedCollection`] loads one page of a larger result set at a time.
//! Page numbers are always normalized into the known page range before a
//! load, and switching pages does a *soft* unload: the data resets but
//! the page fields survive, so the UI keeps its place. A full
//! [`unload`](crate::collection::CollectionExt::unload) is the hard
//! variant that also zeroes the page fields.
//!
//! Loaded payloads have the shape `{"items": [...], "page_count": n}`.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;

use crate::collection::{Collection, CollectionBase, CollectionExt};
use crate::error::{DataError, Result};
use crate::transport::{Transport, TransportRequest};

/// A collection that loads one page at a time.
pub struct PagedCollection {
    base: CollectionBase,
    request: TransportRequest,
    items: Mutex<Vec<Value>>,
    page_number: AtomicU64,
    page_size: u64,
    page_count: AtomicU64,
}

impl PagedCollection {
    /// `request` is the page template; `{page}` and `{page_size}` are
    /// bound on every load.
    pub fn new(
        transport: Arc<dyn Transport>,
        request: TransportRequest,
        page_size: u64,
    ) -> Arc<Self> {
        let collection = Arc::new(Self {
            base: CollectionBase::new(transport),
            request,
            items: Mutex::new(Vec::new()),
            page_number: AtomicU64::new(0),
            page_size,
            page_count: AtomicU64::new(0),
        });
        collection.base.attach(&collection);
        collection
    }

    /// A snapshot of the current page's items.
    pub fn items(&self) -> Vec<Value> {
        self.items.lock().clone()
    }

    pub fn page_number(&self) -> u64 {
        self.page_number.load(Ordering::SeqCst)
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Total pages reported by the last load; 0 while unknown.
    pub fn page_count(&self) -> u64 {
        self.page_count.load(Ordering::SeqCst)
    }

    /// Clamp a requested page into `[0, page_count)`.
    ///
    /// While the page count is unknown (or zero) every request maps to
    /// page 0.
    pub fn normalize_page_number(&self, requested: i64) -> u64 {
        let count = self.page_count();
        if count == 0 {
            return 0;
        }
        requested.clamp(0, count as i64 - 1) as u64
    }

    /// Switch to `page` and load it.
    ///
    /// Any in-flight load is superseded. The data soft-unloads first: the
    /// items reset and `unloaded` fires, but the page fields survive.
    pub fn load_page(self: &Arc<Self>, page: i64) {
        let normalized = self.normalize_page_number(page);
        self.base.cancel_in_flight();
        self.items.lock().clear();
        self.base.loadable().reset();
        self.base.notify_changed();

        self.page_number.store(normalized, Ordering::SeqCst);
        self.load();
    }

    /// Reload the current page.
    pub fn reload_page(self: &Arc<Self>) {
        self.load_page(self.page_number() as i64);
    }
}

impl Collection for PagedCollection {
    fn base(&self) -> &CollectionBase {
        &self.base
    }

    fn request(&self) -> TransportRequest {
        self.request
            .clone()
            .param("page", self.page_number())
            .param("page_size", self.page_size)
    }

    // Hard reset: a full unload forgets the page position too.
    fn init_data(&self) {
        self.items.lock().clear();
        self.page_number.store(0, Ordering::SeqCst);
        self.page_count.store(0, Ordering::SeqCst);
    }

    fn parse_loaded_results(&self, payload: &Value) -> Result<()> {
        // A bare array is accepted as a single unpaginated page; the page
        // count keeps its last known value.
        if let Some(items) = payload.as_array() {
            *self.items.lock() = items.clone();
            return Ok(());
        }

        let object = payload
            .as_object()
            .ok_or_else(|| DataError::UnexpectedShape("expected a JSON object".to_string()))?;
        let items = object
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| DataError::UnexpectedShape("missing 'items' array".to_string()))?;
        let page_count = object
            .get("page_count")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        *self.items.lock() = items.clone();
        self.page_count.store(page_count, Ordering::SeqCst);
        Ok(())
    }
}

impl fmt::Debug for PagedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedCollection")
            .field("state", &self.base.loadable().state())
            .field("page", &self.page_number())
            .field("pages", &self.page_count())
            .finish()
    }
}
