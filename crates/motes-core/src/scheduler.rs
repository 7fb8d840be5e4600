//! Frame scheduling contract between the engine and its host.

/// Cancelable handle for one requested frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Host primitive that delivers timestamped frame callbacks to the engine.
///
/// After `request_frame` the host calls `MotesEngine::on_frame` once with a
/// monotonic timestamp in milliseconds.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;

    fn cancel_frame(&mut self, handle: FrameHandle);

    /// Release pointer and resize listeners; called once on teardown.
    fn detach_listeners(&mut self);
}

/// Scheduler driven by hand: records requests so a loop or test can deliver frames.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_handle: u64,
    pending: Option<FrameHandle>,
    cancelled: Vec<FrameHandle>,
    requests: u64,
    detached: bool,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame requested and neither delivered nor cancelled yet.
    #[must_use]
    pub const fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// Mark the pending frame as delivered, returning its handle.
    pub fn take_pending(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }

    #[must_use]
    pub fn cancelled(&self) -> &[FrameHandle] {
        &self.cancelled
    }

    #[must_use]
    pub const fn requests(&self) -> u64 {
        self.requests
    }

    #[must_use]
    pub const fn is_detached(&self) -> bool {
        self.detached
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_handle);
        self.next_handle += 1;
        self.requests += 1;
        self.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
        self.cancelled.push(handle);
    }

    fn detach_listeners(&mut self) {
        self.detached = true;
    }
}
