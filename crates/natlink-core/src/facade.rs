//! Discovery Facade
//!
//! Single coordination point between applications and the registered
//! controllers. Holds the controller registry, fans lifecycle calls out to
//! every controller, and relays each controller's device events onto two
//! process-wide streams.
//!
//! # Registration
//!
//! [`NatDiscovery::add_controller`] subscribes the relays on the controller's
//! streams *before* the controller becomes visible in the registry, so no
//! event raised after registration can be missed by a later
//! [`NatDiscovery::start_discovery`]. Events raised before registration are
//! never delivered. Entries are never removed; registering the same
//! controller twice doubles both its lifecycle calls and its relayed events.
//!
//! # Failure isolation
//!
//! Start and stop are attempted on every controller. An `Err` or a panic from
//! one controller is logged and recorded in the returned
//! [`LifecycleReport`]; the remaining controllers are still called.

use crate::controller::Controller;
use crate::device::{ControllerId, DeviceEvent};
use crate::error::{ControllerError, NatError, Result};
use crate::event::{EventSource, EventStream, SubscriptionId};
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

/// Which of the two global streams a relay feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayTarget {
    /// Process-wide `device_found`
    Found,
    /// Process-wide `device_lost`
    Lost,
}

/// A relay bound to one (controller, target stream) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relay {
    /// Controller the relay listens to
    pub controller: ControllerId,
    /// Stream the relay publishes on
    pub target: RelayTarget,
    /// Subscription on the controller's own stream
    pub subscription: SubscriptionId,
}

impl Relay {
    fn bind(
        controller: &dyn Controller,
        target: RelayTarget,
        global: &Arc<EventStream<DeviceEvent>>,
    ) -> Self {
        let source = match target {
            RelayTarget::Found => controller.device_found(),
            RelayTarget::Lost => controller.device_lost(),
        };
        let global = Arc::downgrade(global);
        let subscription = source.subscribe(move |event| relay(&global, target, event));
        Self {
            controller: controller.id(),
            target,
            subscription,
        }
    }

    fn unbind(&self, controller: &dyn Controller) -> bool {
        match self.target {
            RelayTarget::Found => controller.device_found().unsubscribe(self.subscription),
            RelayTarget::Lost => controller.device_lost().unsubscribe(self.subscription),
        }
    }
}

fn relay(global: &Weak<EventStream<DeviceEvent>>, target: RelayTarget, event: &DeviceEvent) {
    let Some(global) = global.upgrade() else {
        return;
    };
    let delivered = global.publish(event);
    tracing::trace!(
        sender = %event.sender(),
        ?target,
        delivered,
        "Relayed device event"
    );
}

#[derive(Clone)]
struct RegistryEntry {
    controller: Arc<dyn Controller>,
    found: Relay,
    lost: Relay,
}

/// Read-only view of the registry at one point in time
///
/// Later registrations do not affect an existing snapshot.
#[derive(Clone)]
pub struct ControllerSnapshot {
    entries: Arc<Vec<RegistryEntry>>,
}

impl ControllerSnapshot {
    /// Number of registrations
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Controller at registration position `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arc<dyn Controller>> {
        self.entries.get(index).map(|entry| &entry.controller)
    }

    /// Controllers in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Controller>> + '_ {
        self.entries.iter().map(|entry| &entry.controller)
    }

    /// Relays installed for the registration at `index` (found, lost)
    #[must_use]
    pub fn relays(&self, index: usize) -> Option<(Relay, Relay)> {
        self.entries.get(index).map(|entry| (entry.found, entry.lost))
    }
}

impl fmt::Debug for ControllerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (e.controller.id(), e.controller.name())))
            .finish()
    }
}

/// Lifecycle operation being fanned out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// `start_discovery`
    Start,
    /// `stop_discovery`
    Stop,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
        }
    }
}

/// Why a controller's lifecycle call failed
#[derive(Debug)]
pub enum FailureReason {
    /// The controller returned an error
    Error(ControllerError),
    /// The controller panicked; holds the panic message when it was a string
    Panicked(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(e) => write!(f, "{e}"),
            Self::Panicked(msg) => write!(f, "panicked: {msg}"),
        }
    }
}

/// One isolated controller failure
#[derive(Debug)]
pub struct ControllerFailure {
    /// Registration position
    pub index: usize,
    /// Controller identity
    pub controller: ControllerId,
    /// Controller name at the time of the call
    pub name: String,
    /// What went wrong
    pub reason: FailureReason,
}

/// Outcome of a start/stop fan-out
#[derive(Debug)]
pub struct LifecycleReport {
    /// Operation that was fanned out
    pub phase: LifecyclePhase,
    /// Number of controllers called
    pub attempted: usize,
    /// Controllers whose call failed, in registration order
    pub failures: Vec<ControllerFailure>,
}

impl LifecycleReport {
    /// True when every controller call succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of successful calls
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failures.len()
    }
}

/// Controller registry and event aggregation facade
///
/// Construct one per process and share it by reference (or `Arc`). All
/// methods take `&self` and are safe to call concurrently with event
/// delivery from controller threads.
pub struct NatDiscovery {
    registry: RwLock<Arc<Vec<RegistryEntry>>>,
    device_found: Arc<EventStream<DeviceEvent>>,
    device_lost: Arc<EventStream<DeviceEvent>>,
}

impl NatDiscovery {
    /// Create a facade with an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Arc::new(Vec::new())),
            device_found: Arc::new(EventStream::new()),
            device_lost: Arc::new(EventStream::new()),
        }
    }

    /// Register a controller and start relaying its events
    ///
    /// # Errors
    ///
    /// Returns [`NatError::InvalidArgument`] if the controller has an empty
    /// name. Nothing is subscribed or registered in that case.
    pub fn add_controller(&self, controller: Arc<dyn Controller>) -> Result<()> {
        if controller.name().trim().is_empty() {
            return Err(NatError::InvalidArgument {
                name: "controller",
                reason: "controller name is empty".to_string(),
            });
        }

        let found = Relay::bind(controller.as_ref(), RelayTarget::Found, &self.device_found);
        let lost = Relay::bind(controller.as_ref(), RelayTarget::Lost, &self.device_lost);

        tracing::debug!(
            controller = %controller.id(),
            name = controller.name(),
            "Registering discovery controller"
        );

        let mut registry = self.registry.write();
        Arc::make_mut(&mut *registry).push(RegistryEntry {
            controller,
            found,
            lost,
        });
        Ok(())
    }

    /// Call `start_discovery` on every registered controller, in order
    pub fn start_discovery(&self) -> LifecycleReport {
        self.fan_out(LifecyclePhase::Start)
    }

    /// Call `stop_discovery` on every registered controller, in order
    ///
    /// Does not wait for controllers to finish shutting down.
    pub fn stop_discovery(&self) -> LifecycleReport {
        self.fan_out(LifecyclePhase::Stop)
    }

    /// Snapshot of the registry in registration order
    #[must_use]
    pub fn controllers(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            entries: Arc::clone(&*self.registry.read()),
        }
    }

    /// Devices found by any registered controller
    #[must_use]
    pub fn device_found(&self) -> EventSource<'_, DeviceEvent> {
        self.device_found.source()
    }

    /// Devices lost by any registered controller
    #[must_use]
    pub fn device_lost(&self) -> EventSource<'_, DeviceEvent> {
        self.device_lost.source()
    }

    fn fan_out(&self, phase: LifecyclePhase) -> LifecycleReport {
        let snapshot = self.controllers();
        let mut failures = Vec::new();

        for (index, controller) in snapshot.iter().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| match phase {
                LifecyclePhase::Start => controller.start_discovery(),
                LifecyclePhase::Stop => controller.stop_discovery(),
            }));

            let reason = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => FailureReason::Error(e),
                Err(payload) => FailureReason::Panicked(panic_message(payload.as_ref())),
            };

            tracing::warn!(
                %phase,
                index,
                controller = %controller.id(),
                name = controller.name(),
                reason = %reason,
                "Discovery controller failed"
            );
            failures.push(ControllerFailure {
                index,
                controller: controller.id(),
                name: controller.name().to_string(),
                reason,
            });
        }

        let report = LifecycleReport {
            phase,
            attempted: snapshot.len(),
            failures,
        };
        tracing::info!(
            %phase,
            attempted = report.attempted,
            failed = report.failures.len(),
            "Discovery fan-out complete"
        );
        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl Default for NatDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NatDiscovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NatDiscovery")
            .field("controllers", &self.controllers())
            .field("device_found", &self.device_found)
            .field("device_lost", &self.device_lost)
            .finish()
    }
}

impl Drop for NatDiscovery {
    fn drop(&mut self) {
        for entry in self.registry.get_mut().iter() {
            entry.found.unbind(entry.controller.as_ref());
            entry.lost.unbind(entry.controller.as_ref());
        }
    }
}
