//! # natlink core
//!
//! Coordination layer for NAT traversal discovery.
//!
//! This crate provides:
//! - A registry of pluggable discovery controllers ([`Controller`])
//! - Uniform start/stop across every registered controller, with
//!   per-controller failure isolation
//! - Aggregation of each controller's device found/lost events onto two
//!   process-wide streams
//! - Local address enumeration and private-range classification
//!
//! It performs no protocol work of its own. Concrete controllers (UPnP,
//! NAT-PMP, ...) own their sockets and device model and plug in through the
//! [`Controller`] trait.
//!
//! ## Example
//!
//! ```rust,no_run
//! use natlink_core::{NatDiscovery, address};
//!
//! let discovery = NatDiscovery::new();
//! discovery.device_found().subscribe(|event| {
//!     println!("device from {}", event.sender());
//! });
//!
//! // discovery.add_controller(Arc::new(UpnpController::new()))?;
//! let report = discovery.start_discovery();
//! assert!(report.is_success());
//!
//! for addr in address::local_addresses(false).unwrap_or_default() {
//!     println!("{addr}: private={:?}", address::is_private_address_space(addr));
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod controller;
pub mod device;
pub mod error;
pub mod event;
pub mod facade;

// Re-export commonly used types
pub use address::{
    HostResolver, PrivateRangeCheck, SystemResolver, is_private_address_space, is_private_ipv4,
    is_rfc1918, local_addresses, local_addresses_with,
};
pub use controller::Controller;
pub use device::{ControllerId, DeviceEvent, DevicePayload};
pub use error::{ControllerError, NatError, Result};
pub use event::{EventSource, EventStream, SubscriptionId};
pub use facade::{
    ControllerFailure, ControllerSnapshot, FailureReason, LifecyclePhase, LifecycleReport,
    NatDiscovery, Relay, RelayTarget,
};
