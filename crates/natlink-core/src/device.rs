//! Device events emitted by controllers
//!
//! The device model itself belongs to the controllers. The facade only sees
//! an opaque payload tagged with the [`ControllerId`] of the sender.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTROLLER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique controller identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(u64);

impl ControllerId {
    /// Allocate a fresh identifier
    #[must_use]
    pub fn allocate() -> Self {
        Self(NEXT_CONTROLLER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "controller#{}", self.0)
    }
}

/// Shared, type-erased device description
pub type DevicePayload = Arc<dyn Any + Send + Sync>;

/// A device found or lost by a controller
///
/// Cloning shares the payload; it is never copied or transformed on the way
/// to subscribers.
#[derive(Clone)]
pub struct DeviceEvent {
    sender: ControllerId,
    payload: DevicePayload,
}

impl DeviceEvent {
    /// Wrap a controller-specific device value
    pub fn new<D>(sender: ControllerId, device: D) -> Self
    where
        D: Any + Send + Sync,
    {
        Self {
            sender,
            payload: Arc::new(device),
        }
    }

    /// Build from an already shared payload
    #[must_use]
    pub fn from_payload(sender: ControllerId, payload: DevicePayload) -> Self {
        Self { sender, payload }
    }

    /// Controller that emitted the event
    #[must_use]
    pub fn sender(&self) -> ControllerId {
        self.sender
    }

    /// Opaque payload
    #[must_use]
    pub fn payload(&self) -> &DevicePayload {
        &self.payload
    }

    /// Typed view of the payload, if it is a `D`
    #[must_use]
    pub fn device<D: Any>(&self) -> Option<&D> {
        self.payload.downcast_ref::<D>()
    }
}

impl fmt::Debug for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceEvent")
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Gateway {
        location: &'static str,
    }

    #[test]
    fn test_controller_ids_are_unique() {
        let a = ControllerId::allocate();
        let b = ControllerId::allocate();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
        assert!(a.to_string().starts_with("controller#"));
    }

    #[test]
    fn test_typed_device_access() {
        let id = ControllerId::allocate();
        let event = DeviceEvent::new(id, Gateway { location: "http://10.0.0.1/desc.xml" });

        assert_eq!(event.sender(), id);
        assert_eq!(
            event.device::<Gateway>(),
            Some(&Gateway { location: "http://10.0.0.1/desc.xml" })
        );
        assert!(event.device::<String>().is_none());
    }

    #[test]
    fn test_clone_shares_payload() {
        let event = DeviceEvent::new(ControllerId::allocate(), 42u16);
        let copy = event.clone();
        assert!(Arc::ptr_eq(event.payload(), copy.payload()));
        assert_eq!(copy.sender(), event.sender());
    }

    #[test]
    fn test_from_payload_shares_one_device() {
        let payload: DevicePayload = Arc::new(Gateway {
            location: "http://192.168.0.1/igd.xml",
        });
        let id = ControllerId::allocate();
        let found = DeviceEvent::from_payload(id, Arc::clone(&payload));
        let lost = DeviceEvent::from_payload(id, Arc::clone(&payload));

        assert!(Arc::ptr_eq(found.payload(), lost.payload()));
        assert!(Arc::ptr_eq(found.payload(), &payload));
        assert_eq!(
            lost.device::<Gateway>().map(|g| g.location),
            Some("http://192.168.0.1/igd.xml")
        );
    }

    #[test]
    fn test_debug_hides_payload() {
        let event = DeviceEvent::new(ControllerId::allocate(), "opaque");
        let rendered = format!("{event:?}");
        assert!(rendered.starts_with("DeviceEvent { sender: ControllerId("));
        assert!(rendered.ends_with(".. }"));
    }
}
