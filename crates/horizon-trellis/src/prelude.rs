//! Prelude module for Horizon Trellis.
//!
//! This module re-exports the most commonly used types for convenient importing:
//!
//! ```ignore
//! use horizon_trellis::prelude::*;
//! ```
//!
//! This provides access to:
//! - The class system (`Runtime`, `ClassBuilder`, `Instance`, `MemberTable`)
//! - Mixins and singletons (`MixinDef`, `MixinSpec`, `SingletonDef`)
//! - Debounced scheduling (`SoonScheduler`, `SoonHandle`)
//! - Signals and properties (`Signal`, `Property`, `Watched`)
//! - Collections (`JsonCollection`, `PagedCollection`, `CollectionExt`)

// ============================================================================
// Runtime and Class System
// ============================================================================

pub use crate::{
    Class, ClassBuilder, Instance, Member, MemberTable, MethodReturn, Runtime, Variant,
};

// ============================================================================
// Mixins and Singletons
// ============================================================================

pub use crate::{InstanceRegistry, MixinDef, MixinSpec, SingletonDef};

// ============================================================================
// Debounced Scheduling
// ============================================================================

pub use crate::{BoundMethod, BoundSoon, SoonHandle, SoonResult, SoonScheduler};

// ============================================================================
// Signals and Properties
// ============================================================================

pub use crate::{Computed, ConnectionGuard, ConnectionId, Property, Signal, WatchGuard, Watched};

// ============================================================================
// Containers
// ============================================================================

pub use crate::{IndexedList, OrderedMap};

// ============================================================================
// Errors
// ============================================================================

pub use crate::{Result, TrellisError};

// ============================================================================
// Remote Data
// ============================================================================

pub use crate::data::{
    Collection, CollectionExt, HttpMethod, JsonCollection, JsonCollectionBuilder, LoadState,
    PagedCollection, Transport, TransportRequest, VecCollection,
};
pub use crate::data::register_class_constructor;
