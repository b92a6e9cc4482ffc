//! Keyed debounce scheduler.
//!
//! "Soon" calls collapse bursts of identical work into one execution: a
//! method is scheduled by name, and repeated schedules within the delay
//! window either restart the delay (same arguments) or supersede the
//! pending call outright (different arguments). The object model uses this
//! pervasively to fold storms of "data changed" notifications into a
//! single downstream update, and to implement save-after-idle behavior.
//!
//! Per key the scheduler is a tiny state machine: `idle → pending →
//! (fires | cancelled) → idle`. At most one entry is pending per key at a
//! time; distinct keys are fully independent.
//!
//! The scheduler does not own a thread. Like the rest of the Trellis core
//! it is pumped cooperatively: call [`SoonScheduler::process_ready`] from
//! the host's turn loop (or directly in tests) to fire entries whose delay
//! has elapsed. [`SoonScheduler::time_until_next`] reports how long the
//! host may sleep.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use std::sync::Arc;

use parking_lot::Mutex;

use crate::member::MethodReturn;
use crate::variant::Variant;

/// Why a pending soon call did not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoonError {
    /// A later schedule with different arguments replaced this one.
    Superseded,
    /// The pending call was explicitly cleared.
    Cleared,
    /// The owner of the scheduled method no longer exists.
    OwnerDropped,
    /// The dispatched method itself failed.
    Dispatch(String),
}

impl fmt::Display for SoonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Superseded => write!(f, "superseded by a schedule with different arguments"),
            Self::Cleared => write!(f, "cleared before firing"),
            Self::OwnerDropped => write!(f, "owner dropped before firing"),
            Self::Dispatch(msg) => write!(f, "dispatch failed: {msg}"),
        }
    }
}

impl std::error::Error for SoonError {}

/// The settled outcome of a soon call.
pub type SoonResult = std::result::Result<Variant, SoonError>;

enum HandleState {
    Pending(Vec<Box<dyn FnOnce(&SoonResult) + Send>>),
    Settled(SoonResult),
}

/// A promise-like handle to a pending soon call.
///
/// Handles are cheap to clone and compare by identity: coalesced schedules
/// hand back clones of the *same* handle, which
/// [`same_handle`](SoonHandle::same_handle) detects.
#[derive(Clone)]
pub struct SoonHandle {
    inner: Arc<Mutex<HandleState>>,
}

impl SoonHandle {
    fn pending() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HandleState::Pending(Vec::new()))),
        }
    }

    /// Whether the call has neither fired nor been cancelled yet.
    pub fn is_pending(&self) -> bool {
        matches!(*self.inner.lock(), HandleState::Pending(_))
    }

    /// The settled result, or `None` while still pending.
    pub fn result(&self) -> Option<SoonResult> {
        match &*self.inner.lock() {
            HandleState::Pending(_) => None,
            HandleState::Settled(result) => Some(result.clone()),
        }
    }

    /// Run `f` when the call settles (immediately if it already has).
    pub fn on_done<F>(&self, f: F)
    where
        F: FnOnce(&SoonResult) + Send + 'static,
    {
        let mut state = self.inner.lock();
        match &mut *state {
            HandleState::Pending(callbacks) => callbacks.push(Box::new(f)),
            HandleState::Settled(result) => {
                let result = result.clone();
                drop(state);
                f(&result);
            }
        }
    }

    /// Whether `other` is a clone of this handle.
    pub fn same_handle(&self, other: &SoonHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn settle(&self, result: SoonResult) {
        let callbacks = {
            let mut state = self.inner.lock();
            match std::mem::replace(&mut *state, HandleState::Settled(result.clone())) {
                HandleState::Pending(callbacks) => callbacks,
                settled @ HandleState::Settled(_) => {
                    // First settle wins; restore and bail.
                    *state = settled;
                    return;
                }
            }
        };
        for callback in callbacks {
            callback(&result);
        }
    }

    pub(crate) fn resolve(&self, value: Variant) {
        self.settle(Ok(value));
    }

    pub(crate) fn reject(&self, error: SoonError) {
        self.settle(Err(error));
    }
}

impl fmt::Debug for SoonHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoonHandle")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Dispatches a fired entry to the owning object's method.
///
/// Returning `Err` rejects the handle with [`SoonError::Dispatch`];
/// returning [`MethodReturn::Deferred`] chains the outer handle onto the
/// inner one.
pub type SoonDispatch =
    Arc<dyn Fn(&str, &[Variant]) -> crate::error::Result<MethodReturn> + Send + Sync>;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SoonConfig {
    /// Delay applied when a schedule does not specify one.
    pub default_delay: Duration,
}

impl Default for SoonConfig {
    fn default() -> Self {
        Self {
            default_delay: Duration::from_millis(10),
        }
    }
}

struct SoonEntry {
    deadline: Instant,
    args: Vec<Variant>,
    handle: SoonHandle,
}

/// Keyed debounce scheduler.
///
/// Argument equality is shallow elementwise [`Variant`] equality; note
/// that `Variant::Custom` compares by allocation identity, so schedules
/// carrying freshly boxed custom payloads always supersede.
pub struct SoonScheduler {
    dispatch: SoonDispatch,
    config: SoonConfig,
    entries: Mutex<HashMap<String, SoonEntry>>,
}

impl SoonScheduler {
    /// Create a scheduler that fires entries through `dispatch`.
    pub fn new(dispatch: SoonDispatch) -> Self {
        Self::with_config(dispatch, SoonConfig::default())
    }

    /// Create a scheduler with explicit configuration.
    pub fn with_config(dispatch: SoonDispatch, config: SoonConfig) -> Self {
        Self {
            dispatch,
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Schedule `key` with the default delay.
    pub fn soon(&self, key: &str, args: Vec<Variant>) -> SoonHandle {
        self.soon_after(key, self.config.default_delay, args)
    }

    /// Schedule `key` with a delay given in whole seconds.
    ///
    /// Legacy convenience: the delay is multiplied out to milliseconds
    /// internally, exactly as the original seconds-based callers expect.
    pub fn soon_secs(&self, key: &str, secs: u64, args: Vec<Variant>) -> SoonHandle {
        self.soon_after(key, Duration::from_millis(secs * 1000), args)
    }

    /// Schedule `key` to fire after `delay`.
    ///
    /// - No pending entry: a timer starts and a fresh handle is returned.
    /// - Pending entry with elementwise-equal args: the delay restarts and
    ///   the *same* handle is returned (coalescing).
    /// - Pending entry with different args: the old handle is rejected
    ///   with [`SoonError::Superseded`] and a fresh entry replaces it.
    pub fn soon_after(&self, key: &str, delay: Duration, args: Vec<Variant>) -> SoonHandle {
        let deadline = Instant::now() + delay;
        let handle = SoonHandle::pending();
        let superseded = {
            let mut entries = self.entries.lock();
            if let Some(entry) = entries.get_mut(key) {
                if entry.args == args {
                    entry.deadline = deadline;
                    return entry.handle.clone();
                }
            }
            let old = entries.insert(
                key.to_string(),
                SoonEntry {
                    deadline,
                    args,
                    handle: handle.clone(),
                },
            );
            old.map(|e| e.handle)
        };

        // Reject outside the lock; an on_done callback may reschedule.
        if let Some(old_handle) = superseded {
            tracing::trace!(
                target: "horizon_trellis_core::soon",
                key,
                "superseding pending entry with divergent arguments"
            );
            old_handle.reject(SoonError::Superseded);
        }
        handle
    }

    /// Cancel the pending entry for `key`, rejecting its handle.
    ///
    /// Returns `true` if an entry was pending, `false` for a no-op.
    pub fn clear_soon(&self, key: &str) -> bool {
        let removed = self.entries.lock().remove(key);
        match removed {
            Some(entry) => {
                entry.handle.reject(SoonError::Cleared);
                true
            }
            None => false,
        }
    }

    /// Whether `key` currently has a pending entry.
    pub fn has_pending(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Number of pending entries.
    pub fn pending_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Duration until the earliest pending entry fires.
    ///
    /// Returns `None` when nothing is pending, `Duration::ZERO` when an
    /// entry is already due.
    pub fn time_until_next(&self) -> Option<Duration> {
        let entries = self.entries.lock();
        let now = Instant::now();
        entries
            .values()
            .map(|e| e.deadline.saturating_duration_since(now))
            .min()
    }

    /// Fire every entry whose delay has elapsed.
    ///
    /// Entries fire outside the internal lock, so a dispatched method may
    /// freely reschedule (including its own key). Returns the number of
    /// entries fired.
    pub fn process_ready(&self) -> usize {
        let mut fired = 0;
        loop {
            let due = {
                let mut entries = self.entries.lock();
                let now = Instant::now();
                let key = entries
                    .iter()
                    .find(|(_, e)| e.deadline <= now)
                    .map(|(k, _)| k.clone());
                match key {
                    Some(key) => entries.remove_entry(&key),
                    None => None,
                }
            };

            let Some((key, entry)) = due else {
                break;
            };

            tracing::trace!(target: "horizon_trellis_core::soon", key = %key, "firing debounced entry");
            match (self.dispatch)(&key, &entry.args) {
                Ok(MethodReturn::Value(value)) => entry.handle.resolve(value),
                Ok(MethodReturn::Deferred(inner)) => {
                    // Chain: the outer handle settles when the inner one does.
                    let outer = entry.handle.clone();
                    inner.on_done(move |result| match result {
                        Ok(value) => outer.resolve(value.clone()),
                        Err(err) => outer.reject(err.clone()),
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        target: "horizon_trellis_core::soon",
                        key = %key,
                        error = %err,
                        "scheduled method failed"
                    );
                    let reason = match err {
                        crate::error::TrellisError::Soon(soon_err) => soon_err,
                        other => SoonError::Dispatch(other.to_string()),
                    };
                    entry.handle.reject(reason);
                }
            }
            fired += 1;
        }
        fired
    }
}

impl fmt::Debug for SoonScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoonScheduler")
            .field("pending", &self.pending_count())
            .finish()
    }
}
