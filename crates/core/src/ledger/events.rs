//! Realtime ledger events.
//!
//! Stores publish events only after a commit succeeds, in commit order, each
//! stamped with a monotonically increasing sequence number.

use std::sync::atomic::{AtomicU64, Ordering};

use poolbank_shared::types::{NotificationId, UserId};
use serde::Serialize;
use tokio::sync::broadcast;

use super::types::{Account, AuditEntry, Flag, Notification, Pool, Transaction};

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// A committed change to ledger state.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Pool totals changed.
    PoolChanged(Pool),
    /// An account row changed.
    AccountChanged(Account),
    /// A transaction was recorded.
    TransactionRecorded(Transaction),
    /// A notification was created.
    NotificationCreated(Notification),
    /// A notification was marked as read.
    NotificationRead {
        /// Notification ID.
        id: NotificationId,
        /// Owner.
        user_id: UserId,
    },
    /// An audit entry was written.
    AuditRecorded(AuditEntry),
    /// A transaction was flagged.
    FlagRaised(Flag),
}

impl LedgerEvent {
    /// Returns the event name used on the wire.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PoolChanged(_) => "pool_changed",
            Self::AccountChanged(_) => "account_changed",
            Self::TransactionRecorded(_) => "transaction_recorded",
            Self::NotificationCreated(_) => "notification_created",
            Self::NotificationRead { .. } => "notification_read",
            Self::AuditRecorded(_) => "audit_recorded",
            Self::FlagRaised(_) => "flag_raised",
        }
    }

    /// Returns true if the event concerns the given user's own data.
    #[must_use]
    pub fn touches(&self, user: UserId) -> bool {
        match self {
            Self::AccountChanged(account) => account.id == user,
            Self::TransactionRecorded(tx) => tx.involves(user),
            Self::NotificationCreated(n) => n.user_id == user,
            Self::NotificationRead { user_id, .. } => *user_id == user,
            Self::PoolChanged(_) | Self::AuditRecorded(_) | Self::FlagRaised(_) => false,
        }
    }
}

/// An event together with its position in the commit order.
#[derive(Debug, Clone, Serialize)]
pub struct CommittedEvent {
    /// Global sequence number, strictly increasing.
    pub sequence: u64,
    /// The event.
    #[serde(flatten)]
    pub event: LedgerEvent,
}

/// Fan-out of committed events to realtime subscribers.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<CommittedEvent>,
    sequence: AtomicU64,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    /// Publishes events in order.
    ///
    /// Callers must serialize calls in commit order; the bus only numbers them.
    pub fn publish<I>(&self, events: I)
    where
        I: IntoIterator<Item = LedgerEvent>,
    {
        for event in events {
            let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            // No subscribers is fine; the event is simply dropped.
            let _ = self.sender.send(CommittedEvent { sequence, event });
        }
    }

    /// Subscribes to events committed from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CommittedEvent> {
        self.sender.subscribe()
    }

    /// Returns the sequence number of the last published event.
    #[must_use]
    pub fn last_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_publish_assigns_increasing_sequence() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let now = Utc::now();

        bus.publish(vec![
            LedgerEvent::PoolChanged(Pool::new(dec!(700), dec!(0), now)),
            LedgerEvent::PoolChanged(Pool::new(dec!(650), dec!(0), now)),
        ]);

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(bus.last_sequence(), 2);
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let bus = EventBus::new(4);
        bus.publish(vec![LedgerEvent::PoolChanged(Pool::new(
            dec!(1),
            dec!(0),
            Utc::now(),
        ))]);
        assert_eq!(bus.last_sequence(), 1);
    }

    #[test]
    fn test_touches_filters_by_owner() {
        let owner = UserId::new();
        let account = Account::new(owner, "7712345678".into(), None, Utc::now());
        let event = LedgerEvent::AccountChanged(account);

        assert!(event.touches(owner));
        assert!(!event.touches(UserId::new()));
        assert!(!LedgerEvent::PoolChanged(Pool::new(dec!(0), dec!(0), Utc::now())).touches(owner));
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = CommittedEvent {
            sequence: 7,
            event: LedgerEvent::PoolChanged(Pool::new(dec!(5), dec!(1), Utc::now())),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["sequence"], 7);
        assert_eq!(json["type"], "pool_changed");
        assert_eq!(json["data"]["total_amount"], "5");
    }
}
