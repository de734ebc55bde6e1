//! Live order feed.
//!
//! Every write made through [`crate::services::OrderService`] is published
//! on an [`OrderFeed`] as a typed [`ChangeEvent`]. Consumers call
//! [`OrderFeed::subscribe`] to get an [`OrderSubscription`]: an initial
//! snapshot of the newest orders in scope, followed by the changes that
//! touch that scope. Dropping the subscription (or calling
//! [`OrderSubscription::cancel`]) unsubscribes.

pub mod watcher;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::db::{OrderScope, OrderStore, RepositoryError};
use crate::models::Order;

pub use watcher::{ClientNotification, NotificationCenter, OrderWatcher};

/// Default number of orders in a subscription snapshot.
pub const DEFAULT_WINDOW: u32 = 50;

/// Buffered change events per subscriber before it is considered lagging.
const FEED_CAPACITY: usize = 256;

/// A change to one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Added(Order),
    Modified(Order),
    Removed(Order),
}

impl ChangeEvent {
    /// The order this change refers to.
    #[must_use]
    pub const fn order(&self) -> &Order {
        match self {
            Self::Added(order) | Self::Modified(order) | Self::Removed(order) => order,
        }
    }
}

/// Why a subscription stopped delivering changes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    /// The subscriber fell behind and missed changes.
    #[error("subscriber lagged behind by {0} changes")]
    Lagged(u64),

    /// The feed was shut down.
    #[error("order feed closed")]
    Closed,
}

/// Publishes order changes to live subscribers.
#[derive(Clone)]
pub struct OrderFeed {
    sender: broadcast::Sender<ChangeEvent>,
    orders: Arc<dyn OrderStore>,
}

impl OrderFeed {
    /// Create a feed whose snapshots are read from `orders`.
    #[must_use]
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender, orders }
    }

    /// Publish a change. Having no subscribers is fine.
    pub fn publish(&self, change: ChangeEvent) {
        let receivers = self.sender.send(change).unwrap_or(0);
        tracing::trace!(receivers, "Published order change");
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Subscribe to orders in `scope`.
    ///
    /// The receiver is registered before the snapshot is read, so a change
    /// racing the snapshot is delivered rather than lost.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the snapshot query fails.
    pub async fn subscribe(
        &self,
        scope: OrderScope,
        limit: u32,
    ) -> Result<OrderSubscription, RepositoryError> {
        let receiver = self.sender.subscribe();
        let started_at = Utc::now();
        let snapshot = self.orders.list(&scope, limit).await?;

        Ok(OrderSubscription {
            scope,
            snapshot,
            started_at,
            receiver,
        })
    }
}

/// A live view of the orders in one scope.
pub struct OrderSubscription {
    scope: OrderScope,
    snapshot: Vec<Order>,
    started_at: DateTime<Utc>,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl OrderSubscription {
    /// The scope this subscription covers.
    #[must_use]
    pub const fn scope(&self) -> &OrderScope {
        &self.scope
    }

    /// Orders in scope when the subscription started, newest first.
    #[must_use]
    pub fn snapshot(&self) -> &[Order] {
        &self.snapshot
    }

    /// When the subscription was opened.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Wait for the next change that falls inside the scope.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Lagged` if changes were dropped because this
    /// subscriber fell behind, and `FeedError::Closed` once the feed is gone.
    pub async fn next_change(&mut self) -> Result<ChangeEvent, FeedError> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if self.scope.contains(change.order()) => return Ok(change),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => return Err(FeedError::Lagged(n)),
                Err(broadcast::error::RecvError::Closed) => return Err(FeedError::Closed),
            }
        }
    }

    /// Stop receiving changes.
    pub fn cancel(self) {
        tracing::debug!(scope = ?self.scope, "Order subscription cancelled");
    }
}
