//! The load-state collaborator.
//!
//! Every collection owns a [`Loadable`] that tracks where it is in the
//! `Unloaded → Loading → Loaded | LoadError` lifecycle and fires the
//! corresponding signals. Failures never cross the async boundary as
//! `Err`; they land here as [`LoadState::LoadError`] plus a signal.

use std::fmt;

use horizon_trellis_core::signal::Signal;
use parking_lot::RwLock;

/// Where a loadable currently is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing has been loaded; data is at its initial value.
    #[default]
    Unloaded,
    /// A fetch is in flight.
    Loading,
    /// Data arrived and parsed successfully.
    Loaded,
    /// The fetch or the parse failed.
    LoadError,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unloaded => write!(f, "unloaded"),
            Self::Loading => write!(f, "loading"),
            Self::Loaded => write!(f, "loaded"),
            Self::LoadError => write!(f, "load error"),
        }
    }
}

/// Tracks load state and fires lifecycle signals.
pub struct Loadable {
    state: RwLock<LoadState>,
    error: RwLock<Option<String>>,
    /// Fires after a successful load.
    pub loaded: Signal<()>,
    /// Fires with the failure message after a failed load.
    pub load_error: Signal<String>,
    /// Fires after an unload reset the data.
    pub unloaded: Signal<()>,
}

impl Loadable {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LoadState::Unloaded),
            error: RwLock::new(None),
            loaded: Signal::new(),
            load_error: Signal::new(),
            unloaded: Signal::new(),
        }
    }

    pub fn state(&self) -> LoadState {
        *self.state.read()
    }

    pub fn is_loading(&self) -> bool {
        self.state() == LoadState::Loading
    }

    pub fn is_loaded(&self) -> bool {
        self.state() == LoadState::Loaded
    }

    /// The failure message from the last failed load, if any.
    pub fn error(&self) -> Option<String> {
        self.error.read().clone()
    }

    /// Enter `Loading`, clearing any previous failure.
    pub fn begin_loading(&self) {
        *self.state.write() = LoadState::Loading;
        *self.error.write() = None;
    }

    /// Enter `Loaded` and fire the `loaded` signal.
    pub fn finish_loaded(&self) {
        *self.state.write() = LoadState::Loaded;
        self.loaded.emit(());
    }

    /// Enter `LoadError`, record the message, fire `load_error`.
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(
            target: "horizon_trellis_data::loadable",
            error = %message,
            "load failed"
        );
        *self.state.write() = LoadState::LoadError;
        *self.error.write() = Some(message.clone());
        self.load_error.emit(message);
    }

    /// Return to `Unloaded` and fire `unloaded`.
    pub fn reset(&self) {
        *self.state.write() = LoadState::Unloaded;
        *self.error.write() = None;
        self.unloaded.emit(());
    }
}

impl Default for Loadable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Loadable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loadable")
            .field("state", &self.state())
            .field("error", &*self.error.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_lifecycle_transitions() {
        let loadable = Loadable::new();
        assert_eq!(loadable.state(), LoadState::Unloaded);

        loadable.begin_loading();
        assert!(loadable.is_loading());

        loadable.finish_loaded();
        assert!(loadable.is_loaded());

        loadable.reset();
        assert_eq!(loadable.state(), LoadState::Unloaded);
    }

    #[test]
    fn test_failure_records_message_and_fires() {
        let loadable = Loadable::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        loadable.load_error.connect(move |message: &String| {
            seen_clone.lock().push(message.clone());
        });

        loadable.begin_loading();
        loadable.fail("404 not found");
        assert_eq!(loadable.state(), LoadState::LoadError);
        assert_eq!(loadable.error(), Some("404 not found".to_string()));
        assert_eq!(*seen.lock(), vec!["404 not found".to_string()]);

        // A fresh load clears the failure.
        loadable.begin_loading();
        assert_eq!(loadable.error(), None);
    }
}
