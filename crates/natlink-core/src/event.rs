//! Publish/subscribe primitive
//!
//! [`EventStream`] is a thread-safe multicast list of handler callbacks. Both
//! controllers (for their own `device_found` / `device_lost` channels) and the
//! facade (for the process-wide streams) use it.
//!
//! The handler list is copy-on-write: `publish` clones the current `Arc`
//! under a short read lock and invokes handlers with no lock held. A handler
//! may therefore subscribe or unsubscribe from inside a callback, and
//! publishers on other threads always see a fully built list.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Token returned by [`EventStream::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Multicast event stream
///
/// Events published with no subscriber are dropped; the stream keeps no
/// buffer.
pub struct EventStream<T> {
    next_id: AtomicU64,
    handlers: RwLock<Arc<Vec<(SubscriptionId, Handler<T>)>>>,
}

impl<T> EventStream<T> {
    /// Create a stream with no subscribers
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handlers: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Register a handler invoked for every subsequently published event
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = self.handlers.write();
        Arc::make_mut(&mut *handlers).push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler. Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let Some(pos) = handlers.iter().position(|(sub, _)| *sub == id) else {
            return false;
        };
        Arc::make_mut(&mut *handlers).remove(pos);
        true
    }

    /// Invoke every current handler with `event`, in subscription order.
    ///
    /// Returns the number of handlers invoked.
    pub fn publish(&self, event: &T) -> usize {
        let snapshot = Arc::clone(&*self.handlers.read());
        for (_, handler) in snapshot.iter() {
            handler(event);
        }
        snapshot.len()
    }

    /// Number of handlers currently subscribed
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Subscribe-only view of this stream
    #[must_use]
    pub fn source(&self) -> EventSource<'_, T> {
        EventSource { stream: self }
    }
}

impl<T> Default for EventStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Subscribe-only borrow of an [`EventStream`]
///
/// Handed out where consumers may listen but must not publish.
#[derive(Debug)]
pub struct EventSource<'a, T> {
    stream: &'a EventStream<T>,
}

impl<T> Clone for EventSource<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for EventSource<'_, T> {}

impl<T> EventSource<'_, T> {
    /// See [`EventStream::subscribe`]
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.stream.subscribe(handler)
    }

    /// See [`EventStream::unsubscribe`]
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.stream.unsubscribe(id)
    }

    /// See [`EventStream::subscriber_count`]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.stream.subscriber_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_publish_without_subscribers_drops_event() {
        let stream = EventStream::<u32>::new();
        assert_eq!(stream.publish(&7), 0);
        assert_eq!(stream.subscriber_count(), 0);
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let stream = EventStream::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let seen = Arc::clone(&seen);
            stream.subscribe(move |v: &u32| seen.lock().push(format!("{tag}{v}")));
        }

        assert_eq!(stream.publish(&1), 3);
        assert_eq!(*seen.lock(), vec!["a1", "b1", "c1"]);
    }

    #[test]
    fn test_unsubscribe() {
        let stream = EventStream::<u32>::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let id = stream.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        stream.publish(&1);
        assert!(stream.unsubscribe(id));
        assert!(!stream.unsubscribe(id));
        stream.publish(&2);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(stream.subscriber_count(), 0);
    }

    #[test]
    fn test_subscription_ids_are_unique() {
        let stream = EventStream::<()>::new();
        let a = stream.subscribe(|_| {});
        let b = stream.subscribe(|_| {});
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "sub#1");
    }

    #[test]
    fn test_reentrant_subscribe_sees_next_event_only() {
        let stream = Arc::new(EventStream::<u32>::new());
        let late_hits = Arc::new(AtomicUsize::new(0));

        let inner = Arc::downgrade(&stream);
        let late = Arc::clone(&late_hits);
        stream.subscribe(move |v: &u32| {
            if *v == 1 {
                if let Some(stream) = inner.upgrade() {
                    let late = Arc::clone(&late);
                    stream.subscribe(move |_| {
                        late.fetch_add(1, Ordering::SeqCst);
                    });
                }
            }
        });

        assert_eq!(stream.publish(&1), 1);
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);
        assert_eq!(stream.publish(&2), 2);
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_publish_and_subscribe() {
        let stream = Arc::new(EventStream::<u64>::new());
        let total = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&total);
        stream.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let publishers: Vec<_> = (0..4)
            .map(|_| {
                let stream = Arc::clone(&stream);
                thread::spawn(move || {
                    for i in 0..250 {
                        stream.publish(&i);
                    }
                })
            })
            .collect();

        let subscriber = {
            let stream = Arc::clone(&stream);
            thread::spawn(move || {
                for _ in 0..50 {
                    let id = stream.subscribe(|_| {});
                    stream.unsubscribe(id);
                }
            })
        };

        for handle in publishers {
            handle.join().unwrap();
        }
        subscriber.join().unwrap();

        assert_eq!(total.load(Ordering::SeqCst), 1000);
        assert_eq!(stream.subscriber_count(), 1);
    }

    #[test]
    fn test_source_is_subscribe_only_view() {
        let stream = EventStream::<u8>::new();
        let source = stream.source();
        let id = source.subscribe(|_| {});
        assert_eq!(source.subscriber_count(), 1);
        assert!(source.unsubscribe(id));
        assert_eq!(stream.subscriber_count(), 0);
    }
}
