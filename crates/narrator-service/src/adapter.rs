//! Channel-driven service adapter.
//!
//! Bridges a stream of host signals to an [`AccessibilityService`], one at a
//! time. Besides serializing delivery it owns two pieces of timing: awaiting
//! the speech device's init callback, and coalescing bursts of content-class
//! notifications so the tree is read at most once per notification window.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use narrator_core::config::ServiceConfig;
use narrator_core::types::HostEvent;
use narrator_speech::DeviceInitStatus;

use crate::host::AccessibilityService;

/// A notification from the host platform.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceSignal {
    Connected,
    Event(HostEvent),
    Interrupt,
    Destroy,
}

/// Feeds host signals into a service.
pub struct ServiceAdapter<S: AccessibilityService> {
    service: S,
    config: ServiceConfig,
    timeout: Duration,
    /// Latest coalesced content event and when it is due.
    pending: Option<(HostEvent, Instant)>,
    init: Option<oneshot::Receiver<DeviceInitStatus>>,
}

impl<S: AccessibilityService> ServiceAdapter<S> {
    pub fn new(service: S, config: &ServiceConfig) -> Self {
        Self {
            service,
            config: config.clone(),
            timeout: Duration::from_millis(config.notification_timeout_ms),
            pending: None,
            init: None,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn into_inner(self) -> S {
        self.service
    }

    /// Whether a device init callback is outstanding.
    pub fn awaiting_init(&self) -> bool {
        self.init.is_some()
    }

    /// When the held content event is due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    /// Deliver one signal at time `now`. Returns false once the service has
    /// been destroyed.
    pub fn handle(&mut self, signal: ServiceSignal, now: Instant) -> bool {
        match signal {
            ServiceSignal::Event(event) => {
                if !self.config.is_subscribed(event.kind) {
                    // Never reaches the service, so the held event stays held.
                    tracing::trace!(kind = %event.kind, "Unsubscribed event ignored");
                    return true;
                }
                if event.kind.is_content_class() && !self.timeout.is_zero() {
                    self.hold(event, now);
                } else {
                    self.flush();
                    self.service.on_event(&event);
                }
                true
            }
            ServiceSignal::Connected => {
                self.flush();
                if let Some(init) = self.service.on_connected() {
                    self.init = Some(init);
                }
                true
            }
            ServiceSignal::Interrupt => {
                self.flush();
                self.service.on_interrupt();
                true
            }
            ServiceSignal::Destroy => {
                if let Some((event, _)) = self.pending.take() {
                    tracing::debug!(kind = %event.kind, "Pending event dropped on destroy");
                }
                self.init = None;
                self.service.on_destroy();
                false
            }
        }
    }

    /// Replace the held content event; the window's deadline is kept.
    fn hold(&mut self, event: HostEvent, now: Instant) {
        let due = match self.pending.take() {
            Some((previous, due)) => {
                tracing::trace!(previous = %previous.kind, kind = %event.kind, "Content event coalesced");
                due
            }
            None => now + self.timeout,
        };
        self.pending = Some((event, due));
    }

    /// Deliver the held content event if its window has closed.
    pub fn flush_due(&mut self, now: Instant) {
        if self.next_deadline().is_some_and(|due| due <= now) {
            self.flush();
        }
    }

    /// Deliver the held content event now.
    pub fn flush(&mut self) {
        if let Some((event, _)) = self.pending.take() {
            self.service.on_event(&event);
        }
    }

    /// Deliver a device init status obtained out of band.
    pub fn complete_init(&mut self, status: DeviceInitStatus) {
        self.init = None;
        self.deliver_init(status);
    }

    /// A held event arrived before the device answered, so it is delivered
    /// first and lands while the service is still awaiting init.
    fn deliver_init(&mut self, status: DeviceInitStatus) {
        self.flush();
        self.service.on_device_init(status);
    }

    /// Wait for the outstanding init callback, if any, and deliver it.
    pub async fn await_init(&mut self) {
        if self.init.is_none() {
            return;
        }
        let status = init_status(&mut self.init).await;
        self.deliver_init(status);
    }

    /// Run until the service is destroyed or the signal channel closes.
    ///
    /// Returns the service so callers can inspect it afterwards.
    pub async fn run(mut self, mut signals: mpsc::Receiver<ServiceSignal>) -> S {
        tracing::info!(
            timeout_ms = self.timeout.as_millis() as u64,
            "Service adapter running"
        );
        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                biased;

                status = init_status(&mut self.init), if self.init.is_some() => {
                    self.deliver_init(status);
                }

                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() =>
                {
                    self.flush();
                }

                signal = signals.recv() => {
                    match signal {
                        Some(signal) => {
                            if !self.handle(signal, Instant::now()) {
                                break;
                            }
                        }
                        None => {
                            tracing::debug!("Signal channel closed");
                            self.flush();
                            break;
                        }
                    }
                }
            }
        }
        tracing::info!("Service adapter stopped");
        self.service
    }
}

/// Resolve the init callback and clear the slot. Pends forever when empty.
async fn init_status(init: &mut Option<oneshot::Receiver<DeviceInitStatus>>) -> DeviceInitStatus {
    let Some(receiver) = init.as_mut() else {
        return std::future::pending().await;
    };
    let status = receiver.await.unwrap_or_else(|_| {
        DeviceInitStatus::Failure("device dropped its init callback".to_string())
    });
    *init = None;
    status
}

// =============================================================================
// Tests
// =============================================================================
