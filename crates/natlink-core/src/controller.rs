//! Controller capability
//!
//! A controller implements one NAT discovery protocol (UPnP/SSDP, NAT-PMP,
//! PCP, ...). It owns its sockets, timers and device model; the facade only
//! starts and stops it and listens to its event streams.

use crate::device::{ControllerId, DeviceEvent};
use crate::error::ControllerError;
use crate::event::EventStream;

/// A pluggable discovery protocol
///
/// Implementations may publish on [`Controller::device_found`] and
/// [`Controller::device_lost`] from any thread, including their own
/// background workers.
pub trait Controller: Send + Sync {
    /// Identity stamped on every event this controller emits
    fn id(&self) -> ControllerId;

    /// Human readable protocol name, used in logs. Must not be empty.
    fn name(&self) -> &str;

    /// Begin discovery. May return before discovery work completes.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery could not be initiated.
    fn start_discovery(&self) -> Result<(), ControllerError>;

    /// Stop discovery. Does not wait for background work to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery could not be stopped.
    fn stop_discovery(&self) -> Result<(), ControllerError>;

    /// Stream of devices this controller has found
    fn device_found(&self) -> &EventStream<DeviceEvent>;

    /// Stream of devices this controller has lost
    fn device_lost(&self) -> &EventStream<DeviceEvent>;
}
