use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};
use tokio::sync::mpsc as tokio_mpsc;
use tracing::trace;

type SubscriptionId = u64;

struct Subscription<T> {
    tx: tokio_mpsc::UnboundedSender<T>,
}

/// Fan-out of published values to any number of subscribers
///
/// Publishing never blocks and preserves order per subscriber. A subscription
/// is removed the first time a publish finds its receiver dropped.
pub struct EventHandle<T> {
    subscriptions: Arc<Mutex<HashMap<SubscriptionId, Subscription<T>>>>,
    next_id: Arc<AtomicU64>,
}

impl<T> Clone for EventHandle<T> {
    fn clone(&self) -> Self {
        Self {
            subscriptions: self.subscriptions.clone(),
            next_id: self.next_id.clone(),
        }
    }
}

impl<T> Default for EventHandle<T> {
    fn default() -> Self {
        Self {
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl<T: Clone> EventHandle<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every value published from now on
    /// Subscription is automatically removed when receiver is dropped
    pub fn subscribe(&self) -> tokio_mpsc::UnboundedReceiver<T> {
        let (tx, rx) = tokio_mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        self.subscriptions
            .lock()
            .unwrap()
            .insert(id, Subscription { tx });
        rx
    }

    pub fn publish(&self, value: T) {
        let mut subs = self.subscriptions.lock().unwrap();
        let mut to_remove = Vec::new();

        for (id, subscription) in subs.iter() {
            // If send fails, receiver was dropped - mark for removal
            if subscription.tx.send(value.clone()).is_err() {
                to_remove.push(*id);
            }
        }

        for id in to_remove {
            trace!("Dropping closed subscription {}", id);
            subs.remove(&id);
        }
    }

    /// Drop every subscription, closing the receivers
    #[cfg(test)]
    fn clear(&self) {
        self.subscriptions.lock().unwrap().clear();
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }
}
