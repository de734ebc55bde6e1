//! Turns order changes into client-facing notifications.
//!
//! An [`OrderWatcher`] treats the subscription snapshot as its baseline and
//! never notifies for it. Afterwards:
//!
//! - an added order strictly newer than anything seen yields one
//!   `new_order` notification,
//! - an added order that is not newer is ignored,
//! - a modified order always yields an `order_update` notification,
//! - a removed order is ignored.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::Serialize;

use neyisek_core::{NotificationId, NotificationKind, OrderId};

use super::{ChangeEvent, FeedError, OrderSubscription};
use crate::models::Order;

/// Most notifications a [`NotificationCenter`] keeps.
pub const NOTIFICATION_CAP: usize = 50;

/// A transient notification shown in the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientNotification {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub order_id: OrderId,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    /// The client should play the notification sound.
    pub play_sound: bool,
    /// The client should raise a browser push notification.
    pub push: bool,
}

impl ClientNotification {
    fn new_order(order: &Order) -> Self {
        Self::build(
            NotificationKind::NewOrder,
            "Yeni Sipariş!".to_string(),
            format!(
                "{} adlı müşteriden {} tutarında yeni sipariş",
                order.customer_info.name, order.total_amount
            ),
            order,
        )
    }

    fn order_update(order: &Order) -> Self {
        Self::build(
            NotificationKind::OrderUpdate,
            "Sipariş Güncellendi".to_string(),
            format!(
                "#{} numaralı sipariş durumu: {}",
                short_id(&order.id),
                order.status.label()
            ),
            order,
        )
    }

    fn build(kind: NotificationKind, title: String, message: String, order: &Order) -> Self {
        Self {
            id: NotificationId::generate(),
            kind,
            title,
            message,
            order_id: order.id.clone(),
            read: false,
            created_at: Utc::now(),
            play_sound: true,
            push: true,
        }
    }
}

fn short_id(id: &OrderId) -> &str {
    let s = id.as_str();
    s.get(..8).unwrap_or(s)
}

/// In-memory notification list, newest first.
#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    items: VecDeque<ClientNotification>,
}

impl NotificationCenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a notification, dropping the oldest past the cap.
    pub fn push(&mut self, notification: ClientNotification) {
        self.items.push_front(notification);
        self.items.truncate(NOTIFICATION_CAP);
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    /// Returns false if no notification has `id`.
    pub fn mark_read(&mut self, id: &NotificationId) -> bool {
        self.items
            .iter_mut()
            .find(|n| &n.id == id)
            .map(|n| n.read = true)
            .is_some()
    }

    pub fn mark_all_read(&mut self) {
        for n in &mut self.items {
            n.read = true;
        }
    }

    /// Returns false if no notification has `id`.
    pub fn remove(&mut self, id: &NotificationId) -> bool {
        let before = self.items.len();
        self.items.retain(|n| &n.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientNotification> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Tracks what has been seen on a subscription and decides what to notify.
#[derive(Debug, Clone)]
pub struct OrderWatcher {
    last_seen: DateTime<Utc>,
    center: NotificationCenter,
}

impl OrderWatcher {
    /// Start from a baseline snapshot.
    ///
    /// `started_at` becomes the last-seen time when the snapshot is empty.
    #[must_use]
    pub fn from_baseline(snapshot: &[Order], started_at: DateTime<Utc>) -> Self {
        let last_seen = snapshot
            .iter()
            .map(|order| order.created_at)
            .max()
            .unwrap_or(started_at);

        Self {
            last_seen,
            center: NotificationCenter::new(),
        }
    }

    /// Start from a subscription's own snapshot.
    #[must_use]
    pub fn for_subscription(subscription: &OrderSubscription) -> Self {
        Self::from_baseline(subscription.snapshot(), subscription.started_at())
    }

    #[must_use]
    pub const fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    #[must_use]
    pub const fn center(&self) -> &NotificationCenter {
        &self.center
    }

    pub const fn center_mut(&mut self) -> &mut NotificationCenter {
        &mut self.center
    }

    /// Apply one change. Returns the notification it produced, if any.
    pub fn observe(&mut self, change: &ChangeEvent) -> Option<ClientNotification> {
        let notification = match change {
            ChangeEvent::Added(order) if order.created_at > self.last_seen => {
                self.last_seen = order.created_at;
                ClientNotification::new_order(order)
            }
            ChangeEvent::Modified(order) => ClientNotification::order_update(order),
            ChangeEvent::Added(_) | ChangeEvent::Removed(_) => return None,
        };

        self.center.push(notification.clone());
        Some(notification)
    }

    /// Consume a subscription, yielding notifications until the feed lags
    /// or closes.
    pub fn into_stream(
        mut self,
        mut subscription: OrderSubscription,
    ) -> impl Stream<Item = ClientNotification> + Send {
        async_stream::stream! {
            loop {
                match subscription.next_change().await {
                    Ok(change) => {
                        if let Some(notification) = self.observe(&change) {
                            yield notification;
                        }
                    }
                    Err(FeedError::Lagged(missed)) => {
                        tracing::warn!(
                            scope = ?subscription.scope(),
                            missed,
                            "Order watcher lagged behind the feed, stopping"
                        );
                        break;
                    }
                    Err(FeedError::Closed) => {
                        tracing::warn!(scope = ?subscription.scope(), "Order feed closed, stopping watcher");
                        break;
                    }
                }
            }
        }
    }
}
