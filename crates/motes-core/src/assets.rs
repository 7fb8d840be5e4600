//! Image asset handles and the one-shot "assets ready" signal.
//!
//! Everything here runs on the engine's thread: handles are shared cells the
//! loader resolves from its own callbacks, and readiness is checked by polling
//! once per frame.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::config::ImageSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Loaded,
    /// Load failed; counts as settled so one bad sprite cannot stall readiness.
    Failed,
}

/// Completion signal for a single image load.
#[derive(Debug, Clone)]
pub struct AssetHandle {
    state: Rc<Cell<LoadState>>,
}

impl AssetHandle {
    /// Pending handle plus the completer the loader resolves it with.
    #[must_use]
    pub fn pending() -> (Self, AssetCompleter) {
        let state = Rc::new(Cell::new(LoadState::Pending));
        (
            Self {
                state: Rc::clone(&state),
            },
            AssetCompleter { state },
        )
    }

    /// Handle that is already settled.
    #[must_use]
    pub fn loaded() -> Self {
        Self {
            state: Rc::new(Cell::new(LoadState::Loaded)),
        }
    }

    #[must_use]
    pub fn state(&self) -> LoadState {
        self.state.get()
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state.get() != LoadState::Pending
    }
}

/// Write side of an [`AssetHandle`]; consumed on resolution.
#[derive(Debug)]
pub struct AssetCompleter {
    state: Rc<Cell<LoadState>>,
}

impl AssetCompleter {
    pub fn complete(self) {
        self.state.set(LoadState::Loaded);
    }

    pub fn fail(self) {
        self.state.set(LoadState::Failed);
    }
}

/// Host hook that starts loading an image and hands back its completion signal.
pub trait AssetLoader {
    fn load(&mut self, source: &ImageSource) -> AssetHandle;
}

/// Image attached to an image-shaped particle.
#[derive(Debug, Clone)]
pub struct ParticleImage {
    pub source: ImageSource,
    pub handle: AssetHandle,
}

type ReadyCallback = Box<dyn FnOnce()>;

/// Joins every asset handle into a single notification that fires at most once.
#[derive(Default)]
pub struct AssetReadiness {
    fired: bool,
    disarmed: bool,
    callback: Option<ReadyCallback>,
}

impl fmt::Debug for AssetReadiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetReadiness")
            .field("fired", &self.fired)
            .field("disarmed", &self.disarmed)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl AssetReadiness {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the notification. If readiness already fired it runs immediately.
    pub fn set_callback(&mut self, callback: impl FnOnce() + 'static) {
        if self.disarmed {
            return;
        }
        if self.fired {
            callback();
        } else {
            self.callback = Some(Box::new(callback));
        }
    }

    /// Fire if every handle has settled and this has not fired before.
    /// Returns `true` only on the call that fires.
    pub fn poll<'a>(&mut self, mut handles: impl Iterator<Item = &'a AssetHandle>) -> bool {
        if self.fired || self.disarmed {
            return false;
        }
        if !handles.all(AssetHandle::is_settled) {
            return false;
        }
        self.fired = true;
        if let Some(callback) = self.callback.take() {
            callback();
        }
        true
    }

    /// Ignore every later settlement (engine teardown).
    pub fn disarm(&mut self) {
        self.disarmed = true;
        self.callback = None;
    }

    #[must_use]
    pub const fn has_fired(&self) -> bool {
        self.fired
    }
}
