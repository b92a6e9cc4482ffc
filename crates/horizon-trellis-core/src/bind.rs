//! Memoized bound method handles.
//!
//! Binding a method yields a handle that can be invoked later without the
//! caller holding the instance. Handles are memoized per instance: binding
//! the same method twice returns the same `Arc`, so connect/disconnect
//! bookkeeping keyed on handle identity (`Arc::ptr_eq`) dedups correctly.
//!
//! `bind_soon` yields a debounced variant whose invocation schedules the
//! method through the instance's soon scheduler instead of calling it
//! directly.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::class::Instance;
use crate::error::{ClassError, Result};
use crate::member::MethodReturn;
use crate::soon::SoonHandle;
use crate::variant::Variant;

/// A callable handle to `method` on a specific instance.
///
/// Holds the owner weakly; invoking after the owner dropped fails with
/// [`ClassError::InstanceDropped`].
pub struct BoundMethod {
    owner: Weak<Instance>,
    method: String,
}

impl BoundMethod {
    /// The bound method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Whether the owning instance is still alive.
    pub fn is_alive(&self) -> bool {
        self.owner.strong_count() > 0
    }

    /// Invoke the bound method.
    pub fn invoke(&self, args: &[Variant]) -> Result<MethodReturn> {
        let owner = self.owner.upgrade().ok_or(ClassError::InstanceDropped)?;
        owner.call(&self.method, args)
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("method", &self.method)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// A debounced trigger for `method` on a specific instance.
pub struct BoundSoon {
    owner: Weak<Instance>,
    method: String,
    delay: Duration,
}

impl BoundSoon {
    /// The bound method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The debounce delay schedules use.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule the bound method through the owner's soon scheduler.
    pub fn trigger(&self, args: Vec<Variant>) -> Result<SoonHandle> {
        let owner = self.owner.upgrade().ok_or(ClassError::InstanceDropped)?;
        Ok(owner.soon_after(&self.method, self.delay, args))
    }
}

impl fmt::Debug for BoundSoon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundSoon")
            .field("method", &self.method)
            .field("delay", &self.delay)
            .finish()
    }
}

/// Per-instance cache of bound handles.
pub(crate) struct BoundCache {
    methods: Mutex<HashMap<String, Arc<BoundMethod>>>,
    soons: Mutex<HashMap<(String, Duration), Arc<BoundSoon>>>,
}

impl BoundCache {
    pub(crate) fn new() -> Self {
        Self {
            methods: Mutex::new(HashMap::new()),
            soons: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn bind(&self, owner: &Arc<Instance>, method: &str) -> Arc<BoundMethod> {
        self.methods
            .lock()
            .entry(method.to_string())
            .or_insert_with(|| {
                Arc::new(BoundMethod {
                    owner: Arc::downgrade(owner),
                    method: method.to_string(),
                })
            })
            .clone()
    }

    pub(crate) fn bind_soon(
        &self,
        owner: &Arc<Instance>,
        method: &str,
        delay: Duration,
    ) -> Arc<BoundSoon> {
        self.soons
            .lock()
            .entry((method.to_string(), delay))
            .or_insert_with(|| {
                Arc::new(BoundSoon {
                    owner: Arc::downgrade(owner),
                    method: method.to_string(),
                    delay,
                })
            })
            .clone()
    }
}
