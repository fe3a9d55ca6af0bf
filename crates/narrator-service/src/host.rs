//! Host-facing interfaces.
//!
//! [`AccessibilityHost`] is what the narrator consumes from the platform: a
//! way to read the focused window's tree. [`AccessibilityService`] is what the
//! platform drives: lifecycle hooks invoked one at a time.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use narrator_core::types::{AccessibilityNode, HostEvent};
use narrator_speech::DeviceInitStatus;

/// Source of the active window's accessibility tree.
pub trait AccessibilityHost: Send {
    /// Root of the focused window, or `None` when there is nothing to read.
    ///
    /// The returned tree is used for one traversal and then dropped.
    fn active_root(&self) -> Option<AccessibilityNode>;
}

impl<F> AccessibilityHost for F
where
    F: Fn() -> Option<AccessibilityNode> + Send,
{
    fn active_root(&self) -> Option<AccessibilityNode> {
        self()
    }
}

/// Lifecycle hooks a platform adapter invokes on the narrator.
///
/// Calls are serialized: the host never delivers two at once.
pub trait AccessibilityService {
    /// The host bound the service. Returns the speech device's init
    /// callback for the adapter to await, if creation was started.
    fn on_connected(&mut self) -> Option<oneshot::Receiver<DeviceInitStatus>>;

    /// The speech device finished creation.
    fn on_device_init(&mut self, status: DeviceInitStatus);

    /// An accessibility notification.
    fn on_event(&mut self, event: &HostEvent);

    /// The host asked for feedback to stop.
    fn on_interrupt(&mut self);

    /// The host is unbinding the service.
    fn on_destroy(&mut self);
}

/// Host whose active root is set from outside, e.g. by a trace replayer.
///
/// Clones share the same root.
#[derive(Debug, Clone, Default)]
pub struct SharedRootHost {
    root: Arc<Mutex<Option<AccessibilityNode>>>,
}

impl SharedRootHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: AccessibilityNode) -> Self {
        let host = Self::new();
        host.set_root(root);
        host
    }

    pub fn set_root(&self, root: AccessibilityNode) {
        *self.root.lock().expect("host root mutex poisoned") = Some(root);
    }

    pub fn clear_root(&self) {
        *self.root.lock().expect("host root mutex poisoned") = None;
    }
}

impl AccessibilityHost for SharedRootHost {
    fn active_root(&self) -> Option<AccessibilityNode> {
        self.root.lock().expect("host root mutex poisoned").clone()
    }
}
