//! Narrator Service crate - accessibility event coordination.
//!
//! Provides the coordinator that turns host accessibility notifications into
//! speech through a small state machine: Idle -> AwaitingInit -> Active -> Idle.
//! The coordinator implements a platform-agnostic service interface; a thin
//! adapter feeds it from a channel so it can be driven by a real host, a
//! recorded trace, or a test.

pub mod adapter;
pub mod coordinator;
pub mod host;
pub mod state;

pub use adapter::{ServiceAdapter, ServiceSignal};
pub use coordinator::AccessibilityEventCoordinator;
pub use host::{AccessibilityHost, AccessibilityService, SharedRootHost};
pub use state::CoordinatorState;
