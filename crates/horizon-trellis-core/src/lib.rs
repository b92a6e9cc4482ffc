//! Core object model for Horizon Trellis.
//!
//! This crate provides the foundational components of the Horizon Trellis
//! data toolkit:
//!
//! - **Class System**: Classes composed from superclasses and mixins,
//!   merged into one member table at build time
//! - **Instances**: Ref-counted dynamic objects with a state bag, a keyed
//!   debounce scheduler, and memoized bound methods
//! - **Mixins**: Named, reusable member bundles with soft-failure lookup
//! - **Singletons**: Named one-off instances built straight from a
//!   mixin list
//! - **Soon Scheduler**: Keyed debouncing with coalescing and promise
//!   handles
//! - **Properties**: Reactive cells, computed values, watched slots,
//!   delegates
//! - **Signal/Slot System**: Type-safe notification with RAII guards
//! - **Containers**: Insertion-ordered maps and key-indexed lists
//! - **Runtime**: Explicit owner of every registry
//!
//! # Class Example
//!
//! ```
//! use horizon_trellis_core::class::{ClassBuilder, Instance};
//! use horizon_trellis_core::member::{MemberTable, MethodReturn};
//! use horizon_trellis_core::runtime::Runtime;
//! use horizon_trellis_core::variant::Variant;
//!
//! let runtime = Runtime::new();
//! let class = ClassBuilder::new("Counter")
//!     .members(
//!         MemberTable::new()
//!             .with_data("count", 0)
//!             .with_method("bump", |instance, _args| {
//!                 let count = instance.get("count").as_int().unwrap_or(0) + 1;
//!                 instance.set("count", count);
//!                 MethodReturn::value(count)
//!             }),
//!     )
//!     .build(&runtime)
//!     .unwrap();
//!
//! let counter = Instance::create(class);
//! counter.call("bump", &[]).unwrap();
//! assert_eq!(counter.get("count"), Variant::from(1));
//! ```
//!
//! # Debounce Example
//!
//! ```
//! use std::time::Duration;
//! use horizon_trellis_core::class::{ClassBuilder, Instance};
//! use horizon_trellis_core::member::{MemberTable, MethodReturn};
//! use horizon_trellis_core::runtime::Runtime;
//!
//! let runtime = Runtime::new();
//! let class = ClassBuilder::new("Saver")
//!     .members(MemberTable::new().with_method("save", |_instance, _args| {
//!         MethodReturn::nothing()
//!     }))
//!     .build(&runtime)
//!     .unwrap();
//! let saver = Instance::create(class);
//!
//! // A burst of identical schedules collapses into one pending call.
//! let first = saver.soon_after("save", Duration::ZERO, vec![]);
//! let second = saver.soon_after("save", Duration::ZERO, vec![]);
//! assert!(first.same_handle(&second));
//!
//! assert_eq!(saver.scheduler().process_ready(), 1);
//! ```

pub mod bind;
pub mod class;
mod error;
pub mod indexed_list;
pub mod logging;
pub mod member;
pub mod mixin;
pub mod ordered_map;
pub mod property;
pub mod runtime;
pub mod signal;
pub mod singleton;
pub mod soon;
pub mod uniquify;
pub mod variant;

pub use bind::{BoundMethod, BoundSoon};
pub use class::{Class, ClassBuilder, ClassRegistry, Instance, ProtoLink};
pub use error::{ClassError, PropertyError, RegistryError, Result, TrellisError};
pub use indexed_list::{FieldKeyed, IndexedList};
pub use logging::{DumpOptions, RuntimeDebug};
pub use member::{Member, MemberTable, MethodFn, MethodReturn};
pub use mixin::{MixinDef, MixinRegistry, MixinSpec};
pub use ordered_map::OrderedMap;
pub use property::{Computed, Constant, Delegated, Property, ProtoMap, WatchGuard, Watched};
pub use runtime::{
    global_runtime, init_global_runtime, ConstructorFn, ConstructorRegistry, Runtime,
};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use singleton::{SingletonDef, SingletonRegistry};
pub use soon::{SoonConfig, SoonError, SoonHandle, SoonResult, SoonScheduler};
pub use uniquify::InstanceRegistry;
pub use variant::Variant;
