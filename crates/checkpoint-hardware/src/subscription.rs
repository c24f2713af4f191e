//! Cancellable event subscriptions.
//!
//! A hardware watch (advertisements from a radio, frames from a camera) is
//! handed to the consumer as a [`Subscription`]: an explicit object that
//! yields events and can be cancelled. The producer keeps the matching
//! [`SubscriptionSink`] and stops as soon as the subscription goes away.
//!
//! ```text
//! producer task ── SubscriptionSink::send ──→ [bounded mpsc] ──→ Subscription
//!       ↑                                                            │
//!       └──────── SubscriptionSink::closed() resolves ←── cancel() / Drop
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;

/// Creates a linked sink/subscription pair with room for `capacity`
/// undelivered events.
pub fn subscription<T>(capacity: usize) -> (SubscriptionSink<T>, Subscription<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        SubscriptionSink { tx },
        Subscription {
            rx,
            cancelled: false,
        },
    )
}

/// The consumer end of a hardware watch.
///
/// Cancelling (explicitly or by dropping) closes the channel: the
/// producer's [`SubscriptionSink::closed`] resolves, and no further events
/// are delivered, not even ones already buffered.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::Receiver<T>,
    cancelled: bool,
}

impl<T> Subscription<T> {
    /// Receives the next event. `None` once cancelled or the producer ended.
    pub async fn recv(&mut self) -> Option<T> {
        if self.cancelled {
            return None;
        }
        self.rx.recv().await
    }

    /// Stops the watch. Idempotent.
    pub fn cancel(&mut self) {
        if !self.cancelled {
            self.cancelled = true;
            self.rx.close();
            tracing::trace!("subscription cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        if this.cancelled {
            return Poll::Ready(None);
        }
        this.rx.poll_recv(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// The producer end of a hardware watch.
#[derive(Debug)]
pub struct SubscriptionSink<T> {
    tx: mpsc::Sender<T>,
}

impl<T> SubscriptionSink<T> {
    /// Delivers an event. Returns `false` if the subscription is gone, in
    /// which case the producer should stop.
    pub async fn send(&self, event: T) -> bool {
        self.tx.send(event).await.is_ok()
    }

    /// Resolves once the subscription is cancelled or dropped.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    #[tokio::test]
    async fn test_recv_delivers_in_order() {
        let (sink, mut sub) = subscription(4);
        assert!(sink.send(1).await);
        assert!(sink.send(2).await);
        drop(sink);

        assert_eq!(sub.recv().await, Some(1));
        assert_eq!(sub.recv().await, Some(2));
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_cancel_discards_buffered_events() {
        let (sink, mut sub) = subscription(4);
        sink.send("buffered").await;

        sub.cancel();

        assert_eq!(sub.recv().await, None);
        assert!(sub.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_notifies_producer() {
        let (sink, mut sub) = subscription::<u8>(1);
        sub.cancel();

        sink.closed().await;
        assert!(sink.is_closed());
        assert!(!sink.send(9).await);
    }

    #[tokio::test]
    async fn test_drop_notifies_producer() {
        let (sink, sub) = subscription::<u8>(1);
        drop(sub);

        assert!(sink.is_closed());
    }

    #[tokio::test]
    async fn test_stream_ends_after_cancel() {
        let (sink, mut sub) = subscription(4);
        sink.send(1).await;
        assert_eq!(sub.next().await, Some(1));

        sub.cancel();
        assert_eq!(sub.next().await, None);
    }
}
