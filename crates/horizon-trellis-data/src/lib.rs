//! Data loading module for Horizon Trellis.
//!
//! This crate provides remote-data plumbing on top of the Trellis object
//! model:
//!
//! - **Transport**: A pluggable [`Transport`] trait with parameterized URL
//!   templates, cancellation tokens, and one-shot completion callbacks
//! - **Load lifecycle**: A [`Loadable`] state machine
//!   (`Unloaded → Loading → Loaded | LoadError`) with signals for each
//!   transition
//! - **Collections**: [`Collection`] implementations for plain JSON lists
//!   ([`VecCollection`]), server-side pagination ([`PagedCollection`]),
//!   and typed, hydrated instances ([`JsonCollection`])
//!
//! # Loading a collection
//!
//! ```ignore
//! use horizon_trellis_data::{CollectionExt, JsonCollectionBuilder, TransportRequest};
//!
//! let notes = JsonCollectionBuilder::new(
//!     "notes",
//!     TransportRequest::get("https://api.example.com/notes"),
//! )
//! .default_item_type("note")
//! .build(runtime, transport);
//!
//! notes.on_loaded(|_| println!("notes arrived"));
//! notes.load();
//! ```
//!
//! Completions are matched against a per-collection generation counter, so
//! a stale response from a superseded load is silently discarded. Data
//! mutations coalesce into a single debounced `changed` emission; call
//! `base().pump()` from your event loop (or directly in tests) to fire it.
//!
//! # Typed items
//!
//! [`JsonCollection`] resolves each element's `type` tag through the
//! runtime's constructor registry and hydrates the resulting instance from
//! the element's fields. Use [`register_class_constructor`] to make a
//! class constructible by tag:
//!
//! ```ignore
//! use horizon_trellis_data::register_class_constructor;
//!
//! let class = ClassBuilder::new("Note")
//!     .members(MemberTable::new().with_data("id", Variant::Null))
//!     .build(&runtime)?;
//! register_class_constructor(&runtime, "note", class);
//! ```

mod error;

pub mod collection;
pub mod json;
pub mod json_data;
pub mod loadable;
pub mod paged;
pub mod transport;

pub use error::{DataError, Result};

// Re-export commonly used types at the crate root
pub use collection::{Collection, CollectionBase, CollectionExt, VecCollection};
pub use json::{JsonCollection, JsonCollectionBuilder};
pub use json_data::{
    hydrate_instance, json_to_variant, register_class_constructor, variant_to_json,
};
pub use loadable::{LoadState, Loadable};
pub use paged::PagedCollection;
pub use transport::{
    CancelToken, FetchCallback, HttpMethod, ResponseFormat, Transport, TransportRequest,
};
