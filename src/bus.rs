use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Broadcast topic with bounded capacity.
/// `T` must be `Send + Sync` because we hop across threads.
///
/// Slow subscribers lose the oldest messages; publishing never blocks.
#[derive(Debug, Clone)]
pub struct Topic<T> {
    tx: broadcast::Sender<Arc<T>>,
}

impl<T: Send + Sync + 'static> Topic<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes `msg`; having no subscribers is not an error.
    pub fn publish(&self, msg: T) {
        let _ = self.tx.send(Arc::new(msg));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<T>> {
        self.tx.subscribe()
    }

    /// Subscriber that only cares about the newest message.
    pub fn latest(&self) -> Latest<T> {
        Latest { rx: self.tx.subscribe(), last: None }
    }
}

/// Drains a subscription down to its most recent message.
#[derive(Debug)]
pub struct Latest<T> {
    rx: broadcast::Receiver<Arc<T>>,
    last: Option<Arc<T>>,
}

impl<T> Latest<T> {
    /// Newest message published so far, or `None` before the first one.
    pub fn get(&mut self) -> Option<Arc<T>> {
        loop {
            match self.rx.try_recv() {
                Ok(msg) => self.last = Some(msg),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        self.last.clone()
    }
}
